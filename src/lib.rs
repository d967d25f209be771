//! Broker-agnostic publish/subscribe.
//!
//! Application code talks to a [`Bus`]; the bus talks to a [`Transport`].
//! Swapping the in-memory transport for a Redis or MQTT one changes no
//! application code.
//!
//! On top of the transport, a bus adds:
//! - self-message suppression: a bus never receives what it published
//! - a bounded [`RetryQueue`] for publishes the transport rejected
//! - content-hash deduplication of queued retries ([`MessageHasher`])
//! - retry draining on inbound traffic, reconnects and an optional timer

mod bus;
mod encoder;
mod error;
mod hasher;
mod manager;
mod message;
pub mod retry_queue;
pub mod transport;

pub use bus::{Bus, BusOptions};
pub use encoder::{JsonEncoder, TransportEncoder};
pub use error::{BusError, EncodeError, TransportError};
pub use hasher::MessageHasher;
pub use manager::{BusManager, BusManagerConfig, TransportConfig, TransportFactory};
pub use message::{Envelope, Message};
pub use retry_queue::{
    QueueStrategy, RetryInterval, RetryQueue, RetryQueueOptions, RetryQueueWithDuplicates,
    RetryQueueWithoutDuplicates, SharedRetryQueue,
};
pub use transport::{ChaosSwitch, ChaosTransport, EnvelopeHandler, ReconnectCallback, Transport};

#[cfg(feature = "memory")]
pub use transport::{MemoryHub, MemoryTransport};
