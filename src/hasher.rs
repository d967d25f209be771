//! Content hashing for retry queue deduplication.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::message::Message;

/// Computes a deterministic, key-order independent digest of a message.
///
/// The value is rendered as compact JSON with object keys sorted at every
/// depth, hashed with SHA-256 and encoded as base64. Two payloads that only
/// differ in the order their object keys were inserted hash identically.
///
/// ```
/// use busline::MessageHasher;
/// use serde_json::json;
///
/// let hasher = MessageHasher::new();
/// assert_eq!(
///     hasher.hash(&json!({ "foo": "bar", "baz": "qux" })),
///     hasher.hash(&json!({ "baz": "qux", "foo": "bar" })),
/// );
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageHasher;

impl MessageHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a message into its deduplication key.
    pub fn hash(&self, value: &Message) -> String {
        let mut digest = Sha256::new();
        write_canonical(value, &mut digest);
        STANDARD.encode(digest.finalize())
    }
}

fn write_canonical(value: &Message, digest: &mut Sha256) {
    match value {
        Message::Array(items) => {
            digest.update(b"[");
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    digest.update(b",");
                }
                write_canonical(item, digest);
            }
            digest.update(b"]");
        }
        Message::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            digest.update(b"{");
            for (index, (key, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    digest.update(b",");
                }
                // Quote and escape the key exactly like a JSON string value.
                digest.update(Message::String(key.clone()).to_string().as_bytes());
                digest.update(b":");
                write_canonical(item, digest);
            }
            digest.update(b"}");
        }
        scalar => digest.update(scalar.to_string().as_bytes()),
    }
}
