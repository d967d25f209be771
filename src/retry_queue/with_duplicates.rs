//! Retry queue that keeps every failed publish, duplicates included.

use std::collections::VecDeque;
use std::future::Future;

use tracing::debug;

use super::drain::{drain, DrainSource, RetryEntry, RetryOutcome};
use crate::message::Envelope;

/// Bounded FIFO of failed publishes.
///
/// When full, the oldest entry is evicted to make room for the new one.
#[derive(Debug)]
pub struct RetryQueueWithDuplicates {
    entries: VecDeque<RetryEntry>,
    enabled: bool,
    max_size: Option<usize>,
    next_seq: u64,
}

impl Default for RetryQueueWithDuplicates {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl RetryQueueWithDuplicates {
    /// Create a queue. A `max_size` of `None` or `0` is unbounded.
    pub fn new(enabled: bool, max_size: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
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

    /// Queue a message for later redelivery.
    ///
    /// Returns `false` only when the queue is disabled.
    pub fn enqueue(&mut self, channel: impl Into<String>, message: Envelope) -> bool {
        if !self.enabled {
            return false;
        }

        if self.is_full() {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(channel = %evicted.channel, "retry queue full, evicted oldest entry");
            }
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.push_back(RetryEntry {
            seq,
            channel: channel.into(),
            message,
        });
        true
    }

    /// Remove and return the oldest queued message.
    pub fn dequeue(&mut self) -> Option<Envelope> {
        if !self.enabled {
            return None;
        }
        self.entries.pop_front().map(|entry| entry.message)
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
}

impl DrainSource for RetryQueueWithDuplicates {
    fn front(&mut self) -> Option<RetryEntry> {
        if !self.enabled {
            return None;
        }
        self.entries.front().cloned()
    }

    fn acknowledge(&mut self, seq: u64) {
        if self.entries.front().is_some_and(|entry| entry.seq == seq) {
            self.entries.pop_front();
        }
    }
}
