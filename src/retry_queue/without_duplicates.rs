//! Retry queue that holds at most one entry per payload.

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use tracing::debug;

use super::drain::{drain, DrainSource, RetryEntry, RetryOutcome};
use crate::hasher::MessageHasher;
use crate::message::Envelope;

#[derive(Debug)]
struct HashedEntry {
    hash: String,
    entry: RetryEntry,
}

/// Bounded FIFO of failed publishes, deduplicated by payload hash.
///
/// An entry whose payload hashes like one already queued is rejected
/// without touching the queue. Capacity eviction only happens when a new
/// hash is inserted into a full queue.
#[derive(Debug)]
pub struct RetryQueueWithoutDuplicates {
    entries: VecDeque<HashedEntry>,
    hashes: HashSet<String>,
    hasher: MessageHasher,
    enabled: bool,
    max_size: Option<usize>,
    next_seq: u64,
}

impl Default for RetryQueueWithoutDuplicates {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl RetryQueueWithoutDuplicates {
    /// Create a queue. A `max_size` of `None` or `0` is unbounded.
    pub fn new(enabled: bool, max_size: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            hashes: HashSet::new(),
            hasher: MessageHasher::new(),
            enabled,
            max_size: max_size.filter(|max| *max > 0),
            next_seq: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a message with the same payload is already queued.
    pub fn contains(&self, message: &Envelope) -> bool {
        self.hashes.contains(&self.hasher.hash(&message.payload))
    }

    /// Queue a message for later redelivery.
    ///
    /// Returns `false` when the queue is disabled or the payload is already
    /// queued.
    pub fn enqueue(&mut self, channel: impl Into<String>, message: Envelope) -> bool {
        if !self.enabled {
            return false;
        }

        let hash = self.hasher.hash(&message.payload);
        if self.hashes.contains(&hash) {
            debug!(hash = %hash, "payload already queued for retry");
            return false;
        }

        if self.is_full() {
            if let Some(evicted) = self.pop_oldest() {
                debug!(channel = %evicted.channel, "retry queue full, evicted oldest entry");
            }
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.hashes.insert(hash.clone());
        self.entries.push_back(HashedEntry {
            hash,
            entry: RetryEntry {
                seq,
                channel: channel.into(),
                message,
            },
        });
        true
    }

    /// Remove and return the oldest queued message.
    pub fn dequeue(&mut self) -> Option<Envelope> {
        if !self.enabled {
            return None;
        }
        self.pop_oldest().map(|entry| entry.message)
    }

    /// Redeliver queued messages oldest first, stopping at the first failure.
    ///
    /// Returns the number of entries delivered and removed.
    pub async fn process<F, Fut>(&mut self, handler: F) -> usize
    where
        F: FnMut(String, Envelope) -> Fut,
        Fut: Future,
        Fut::Output: RetryOutcome,
    {
        drain(self, handler).await
    }

    fn is_full(&self) -> bool {
        matches!(self.max_size, Some(max) if self.entries.len() >= max)
    }

    fn pop_oldest(&mut self) -> Option<RetryEntry> {
        let HashedEntry { hash, entry } = self.entries.pop_front()?;
        self.hashes.remove(&hash);
        Some(entry)
    }
}

impl DrainSource for RetryQueueWithoutDuplicates {
    fn front(&mut self) -> Option<RetryEntry> {
        if !self.enabled {
            return None;
        }
        self.entries.front().map(|hashed| hashed.entry.clone())
    }

    fn acknowledge(&mut self, seq: u64) {
        if self
            .entries
            .front()
            .is_some_and(|hashed| hashed.entry.seq == seq)
        {
            self.pop_oldest();
        }
    }
}
