//! Fault-injecting transport wrapper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{EnvelopeHandler, ReconnectCallback, Transport};
use crate::error::TransportError;
use crate::message::Envelope;

/// Remote control for a [`ChaosTransport`].
///
/// Clone it before handing the transport to a bus; every clone drives the
/// same transport.
#[derive(Clone, Default)]
pub struct ChaosSwitch {
    failing: Arc<AtomicBool>,
    reconnect: Arc<Mutex<Option<ReconnectCallback>>>,
}

impl ChaosSwitch {
    /// Make every publish fail until [`never_fail`](Self::never_fail).
    pub fn always_fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Let publishes through to the inner transport again.
    pub fn never_fail(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// Fire the reconnect callback registered by the owning bus, as a real
    /// transport would after its connection is restored.
    ///
    /// Returns `false` if no callback was registered.
    pub fn trigger_reconnect(&self) -> bool {
        let callback = self
            .reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    fn register_reconnect(&self, callback: ReconnectCallback) {
        *self
            .reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}

/// Wraps a transport and fails its publishes on demand.
///
/// Subscribe, unsubscribe and disconnect always go straight through.
pub struct ChaosTransport<T> {
    inner: T,
    switch: ChaosSwitch,
}

impl<T: Transport> ChaosTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            switch: ChaosSwitch::default(),
        }
    }

    /// A handle controlling this transport.
    pub fn switch(&self) -> ChaosSwitch {
        self.switch.clone()
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for ChaosTransport<T> {
    fn name(&self) -> &'static str {
        "chaos"
    }

    fn set_id(&mut self, id: &str) {
        self.inner.set_id(id);
    }

    fn on_reconnect(&mut self, callback: ReconnectCallback) {
        self.switch.register_reconnect(Arc::clone(&callback));
        self.inner.on_reconnect(callback);
    }

    async fn publish(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError> {
        if self.switch.is_failing() {
            return Err(TransportError::Unavailable(
                "chaos: publish failure injected".into(),
            ));
        }
        self.inner.publish(channel, envelope).await
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: EnvelopeHandler,
    ) -> Result<(), TransportError> {
        self.inner.subscribe(channel, handler).await
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.inner.unsubscribe(channel).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.disconnect().await
    }
}
