//! Transports - the brokers a bus can run over
//!
//! A transport moves envelopes between buses. The bus only depends on the
//! [`Transport`] trait, so the same application code runs over memory,
//! a key-value store's pub/sub or an MQTT broker.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Bus (per transport)                      │
//! │  - stamps bus id, retries failed publishes                  │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transport trait                         │
//! │  set_id / on_reconnect / publish / subscribe / unsubscribe  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                  │                     │
//!          ▼                  ▼                     ▼
//! ┌─────────────────┐ ┌───────────────┐  ┌─────────────────────┐
//! │ MemoryTransport │ │ RedisTransport│  │   MqttTransport     │
//! │   (included)    │ │  (external)   │  │    (external)       │
//! └─────────────────┘ └───────────────┘  └─────────────────────┘
//! ```

mod chaos;
#[cfg(feature = "memory")]
mod memory;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::TransportError;
use crate::message::Envelope;

pub use chaos::{ChaosSwitch, ChaosTransport};
#[cfg(feature = "memory")]
pub use memory::{MemoryHub, MemoryTransport};

/// Callback fired by a transport whenever connectivity is restored.
pub type ReconnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback a transport invokes with every inbound envelope on a channel.
pub type EnvelopeHandler = Arc<dyn Fn(Envelope) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure into an [`EnvelopeHandler`].
pub fn envelope_handler<F, Fut>(handler: F) -> EnvelopeHandler
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |envelope| handler(envelope).boxed())
}

/// Capability contract every transport implements.
///
/// Implementations might include:
/// - `MemoryTransport` - For testing and single-process scenarios
/// - `RedisTransport` - For a key-value store's pub/sub channels
/// - `MqttTransport` - For MQTT brokers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Bind the owning bus's identity. Called once, before any publish.
    fn set_id(&mut self, id: &str);

    /// Register a callback fired whenever connectivity is restored.
    ///
    /// Transports without a notion of reconnecting can keep the default,
    /// which drops the callback.
    fn on_reconnect(&mut self, _callback: ReconnectCallback) {}

    /// Send an envelope on a channel.
    async fn publish(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError>;

    /// Deliver every envelope published on `channel` by another identity to
    /// `handler`. Envelopes stamped with this transport's own id are dropped.
    async fn subscribe(&self, channel: &str, handler: EnvelopeHandler)
        -> Result<(), TransportError>;

    /// Stop delivering `channel` to this transport's subscribers.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Release every resource held by the transport. Idempotent.
    async fn disconnect(&self) -> Result<(), TransportError>;
}
