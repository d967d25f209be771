//! Background retry triggers: the periodic drain task and the drain guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::bus::BusInner;

/// Ensures only one drain runs per bus at a time.
///
/// Released when dropped, so every exit path of a drain clears it.
pub(crate) struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the periodic drain task. Aborting is idempotent.
#[derive(Default)]
pub(crate) struct RetryTask {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetryTask {
    pub(crate) fn start(&self, runtime: &Handle, bus: Weak<BusInner>, period: Duration) {
        let handle = runtime.spawn(run(bus, period));
        if let Some(previous) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }

    /// Abort the task. Returns `false` if there was nothing to abort.
    pub(crate) fn abort(&self) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RetryTask {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run(bus: Weak<BusInner>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        // The task holds no strong reference between ticks; once the last
        // bus handle is gone it stops on its own.
        let Some(bus) = bus.upgrade() else {
            break;
        };
        bus.process_error_retry_queue().await;
    }
}
