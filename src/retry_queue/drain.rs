//! The drain loop shared by every retry queue flavour.

use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::message::Envelope;

/// A queued publish attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryEntry {
    pub(crate) seq: u64,
    pub channel: String,
    pub message: Envelope,
}

/// Outcome of a retry handler.
///
/// Handlers may answer with a plain `bool`, a `Result<bool, E>` or a
/// `Result<(), E>`. `false` and `Err` both count as a failed redelivery.
pub trait RetryOutcome {
    fn succeeded(self) -> bool;
}

impl RetryOutcome for bool {
    fn succeeded(self) -> bool {
        self
    }
}

impl<E: fmt::Display> RetryOutcome for Result<bool, E> {
    fn succeeded(self) -> bool {
        match self {
            Ok(delivered) => delivered,
            Err(err) => {
                debug!(error = %err, "retry handler failed");
                false
            }
        }
    }
}

impl<E: fmt::Display> RetryOutcome for Result<(), E> {
    fn succeeded(self) -> bool {
        self.map(|()| true).succeeded()
    }
}

/// Access a drain needs to a queue.
pub(crate) trait DrainSource {
    /// Oldest entry, or `None` when empty or disabled.
    fn front(&mut self) -> Option<RetryEntry>;

    /// Remove the entry with this sequence number if it is still the oldest.
    fn acknowledge(&mut self, seq: u64);
}

/// Hand entries to `handler` oldest first until the queue is empty or a
/// redelivery fails. The failed entry and everything after it stay queued.
///
/// Returns the number of entries delivered.
pub(crate) async fn drain<S, F, Fut>(source: &mut S, mut handler: F) -> usize
where
    S: DrainSource + ?Sized,
    F: FnMut(String, Envelope) -> Fut,
    Fut: Future,
    Fut::Output: RetryOutcome,
{
    let mut delivered = 0;

    while let Some(RetryEntry {
        seq,
        channel,
        message,
    }) = source.front()
    {
        if !handler(channel, message).await.succeeded() {
            break;
        }
        source.acknowledge(seq);
        delivered += 1;
    }

    delivered
}
