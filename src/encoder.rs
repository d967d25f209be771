//! Wire encoders used by transports to put envelopes on the wire.

use crate::error::EncodeError;
use crate::message::Envelope;

/// Turns envelopes into bytes and back.
///
/// Implementations must round-trip every valid [`Message`](crate::Message)
/// exactly.
pub trait TransportEncoder: Send + Sync {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError>;

    fn decode(&self, data: &[u8]) -> Result<Envelope, EncodeError>;
}

/// JSON encoder, the default for every shipped transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEncoder;

impl TransportEncoder for JsonEncoder {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(envelope).map_err(EncodeError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, EncodeError> {
        serde_json::from_slice(data).map_err(EncodeError::Decode)
    }
}
