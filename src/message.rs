//! Messages and the envelope that carries them between buses.

use serde::{Deserialize, Serialize};

/// A structurally serializable message payload.
///
/// Strings, numbers, booleans, null, arrays and string-keyed objects,
/// recursively. Messages carry no identity of their own.
pub type Message = serde_json::Value;

/// A payload stamped with the id of the bus that published it.
///
/// The `bus_id` is set by the owning [`Bus`](crate::Bus) at publish time and
/// is what lets a transport (or the bus itself) drop messages that loop back
/// to their sender.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Id of the publishing bus
    pub bus_id: String,
    /// User payload
    pub payload: Message,
}

impl Envelope {
    /// Create an envelope for the given bus id and payload.
    pub fn new(bus_id: impl Into<String>, payload: impl Into<Message>) -> Self {
        Self {
            bus_id: bus_id.into(),
            payload: payload.into(),
        }
    }

    /// Whether this envelope was published by the bus with the given id.
    pub fn is_from(&self, bus_id: &str) -> bool {
        self.bus_id == bus_id
    }
}
