//! Error types for the bus, its transports and encoders.

use std::error::Error;

use thiserror::Error;

/// Error raised while encoding or decoding an envelope on the wire.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    /// The received bytes are not a valid envelope.
    #[error("failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    /// `publish` was called before the owning bus handed over its id.
    #[error("transport has no bus id, call set_id before publishing")]
    NotIdentified,
    /// The envelope could not be put on the wire.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The broker refused the operation.
    #[error("rejected by broker: {0}")]
    Rejected(String),
    /// Other error
    #[error("transport error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

/// Error type for bus construction and bus manager lookups.
///
/// Publish failures are never reported through this type; they are
/// absorbed by the retry queue and surface as a `false` return.
#[derive(Debug, Error)]
pub enum BusError {
    /// No transport name was given and the manager has no default.
    #[error("cannot create bus instance, no default transport is defined in the config")]
    NoDefaultTransport,
    /// The requested transport name is not configured.
    #[error("unknown transport: {0}")]
    UnknownTransport(String),
    /// The retry interval could not be turned into a duration.
    #[error("invalid retry interval: {0}")]
    InvalidRetryInterval(String),
    /// A retry interval was configured outside of a Tokio runtime.
    #[error("a retry interval requires a running Tokio runtime")]
    RuntimeUnavailable,
    /// A typed message could not be converted to or from JSON.
    #[error("message serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The transport failed a subscribe, unsubscribe or disconnect.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
