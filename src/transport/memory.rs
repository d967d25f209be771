//! In-memory transport for testing and single-process scenarios.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{EnvelopeHandler, Transport};
use crate::encoder::{JsonEncoder, TransportEncoder};
use crate::error::TransportError;
use crate::message::Envelope;

#[derive(Clone)]
struct Subscription {
    bus_id: String,
    handler: EnvelopeHandler,
    encoder: Arc<dyn TransportEncoder>,
}

/// Subscription registry shared by a family of [`MemoryTransport`]s.
///
/// Transports created from the same hub (or clones of it) see each other's
/// messages; transports from different hubs are isolated. Tests create one
/// hub per case, or call [`reset`](MemoryHub::reset) between cases.
///
/// ## Example
///
/// ```
/// use busline::{Bus, BusOptions, MemoryHub};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), busline::BusError> {
/// let hub = MemoryHub::new();
/// let bus_a = Bus::new(hub.transport(), BusOptions::default())?;
/// let bus_b = Bus::new(hub.transport(), BusOptions::default())?;
///
/// bus_a.subscribe("news", |payload| async move {
///     println!("got {payload}");
/// }).await?;
///
/// assert!(bus_b.publish("news", "hello").await);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryHub {
    subscriptions: Arc<RwLock<HashMap<String, Vec<Subscription>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport attached to this hub, using the JSON encoder.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport::new(self)
    }

    /// Number of subscriptions registered on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.read().get(channel).map_or(0, Vec::len)
    }

    /// Drop every subscription on every channel.
    pub fn reset(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Subscription>>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Subscription>>> {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self, channel: &str) -> Vec<Subscription> {
        self.read().get(channel).cloned().unwrap_or_default()
    }

    fn add(&self, channel: &str, subscription: Subscription) {
        self.write()
            .entry(channel.to_string())
            .or_default()
            .push(subscription);
    }

    fn remove(&self, channel: &str, bus_id: &str) {
        let mut subscriptions = self.write();
        if let Some(subscribers) = subscriptions.get_mut(channel) {
            subscribers.retain(|subscription| subscription.bus_id != bus_id);
            if subscribers.is_empty() {
                subscriptions.remove(channel);
            }
        }
    }

    fn remove_all(&self, bus_id: &str) {
        let mut subscriptions = self.write();
        for subscribers in subscriptions.values_mut() {
            subscribers.retain(|subscription| subscription.bus_id != bus_id);
        }
        subscriptions.retain(|_, subscribers| !subscribers.is_empty());
    }
}

/// Transport delivering envelopes to other transports of the same hub.
///
/// Each envelope is encoded with the publisher's encoder and decoded with
/// every subscriber's, so the wire format is exercised as it would be over a
/// real broker. Delivery is inline: `publish` returns once every subscriber
/// handler has completed.
pub struct MemoryTransport {
    hub: MemoryHub,
    id: Option<String>,
    encoder: Arc<dyn TransportEncoder>,
}

impl MemoryTransport {
    pub fn new(hub: &MemoryHub) -> Self {
        Self {
            hub: hub.clone(),
            id: None,
            encoder: Arc::new(JsonEncoder),
        }
    }

    /// Use a different wire encoder.
    pub fn with_encoder(mut self, encoder: impl TransportEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Bind an id directly, for using the transport without a bus.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn require_id(&self) -> Result<&str, TransportError> {
        self.id.as_deref().ok_or(TransportError::NotIdentified)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set_id(&mut self, id: &str) {
        self.id = Some(id.to_string());
    }

    async fn publish(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError> {
        let id = self.require_id()?;
        let bytes = self.encoder.encode(envelope)?;

        for subscription in self.hub.subscribers(channel) {
            if subscription.bus_id == id {
                continue;
            }

            match subscription.encoder.decode(&bytes) {
                Ok(received) => (subscription.handler)(received).await,
                Err(err) => warn!(
                    channel = channel,
                    error = %err,
                    "dropping undecodable message"
                ),
            }
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: EnvelopeHandler,
    ) -> Result<(), TransportError> {
        let id = self.require_id()?;
        self.hub.add(
            channel,
            Subscription {
                bus_id: id.to_string(),
                handler,
                encoder: Arc::clone(&self.encoder),
            },
        );
        debug!(channel = channel, bus_id = id, "memory subscription added");
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        if let Some(id) = self.id.as_deref() {
            self.hub.remove(channel, id);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if let Some(id) = self.id.as_deref() {
            self.hub.remove_all(id);
        }
        Ok(())
    }
}
