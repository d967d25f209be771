//! Retry Queue - bounded local buffer of publishes awaiting redelivery
//!
//! When a transport fails to send, the bus parks the envelope here and
//! redelivers it later, oldest first.
//!
//! ## Flavours
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                RetryQueue (per bus, fixed)                 │
//! │  enqueue() / dequeue() / process() / size()                │
//! └────────────────────────────────────────────────────────────┘
//!              │ remove_duplicates = false    │ remove_duplicates = true
//!              ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │ RetryQueueWithDuplicates │   │ RetryQueueWithoutDuplicates  │
//! │ every failure is queued  │   │ one entry per payload hash   │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Both flavours evict the oldest entry when full and stop a drain at the
//! first failed redelivery, so a later message on a channel is never
//! redelivered ahead of an earlier one that is still failing.

mod drain;
mod options;
mod with_duplicates;
mod without_duplicates;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use drain::{RetryEntry, RetryOutcome};
pub use options::{RetryInterval, RetryQueueOptions};
pub use with_duplicates::RetryQueueWithDuplicates;
pub use without_duplicates::RetryQueueWithoutDuplicates;

use drain::{drain, DrainSource};

use crate::message::Envelope;

/// The queue flavour chosen at construction.
#[derive(Debug)]
pub enum QueueStrategy {
    WithDuplicates(RetryQueueWithDuplicates),
    WithoutDuplicates(RetryQueueWithoutDuplicates),
}

impl DrainSource for QueueStrategy {
    fn front(&mut self) -> Option<RetryEntry> {
        match self {
            QueueStrategy::WithDuplicates(queue) => queue.front(),
            QueueStrategy::WithoutDuplicates(queue) => queue.front(),
        }
    }

    fn acknowledge(&mut self, seq: u64) {
        match self {
            QueueStrategy::WithDuplicates(queue) => queue.acknowledge(seq),
            QueueStrategy::WithoutDuplicates(queue) => queue.acknowledge(seq),
        }
    }
}

/// Retry queue facade.
///
/// ```
/// use busline::{Envelope, RetryQueue, RetryQueueOptions};
///
/// let mut queue = RetryQueue::new(RetryQueueOptions::new().with_max_size(2));
///
/// assert!(queue.enqueue("orders", Envelope::new("bus-1", "a")));
/// assert!(!queue.enqueue("orders", Envelope::new("bus-1", "a")));
/// assert_eq!(queue.size(), 1);
/// ```
#[derive(Debug)]
pub struct RetryQueue {
    options: RetryQueueOptions,
    strategy: QueueStrategy,
}

impl Default for RetryQueue {
    fn default() -> Self {
        Self::new(RetryQueueOptions::default())
    }
}

impl RetryQueue {
    pub fn new(options: RetryQueueOptions) -> Self {
        let max_size = options.capacity();
        let strategy = if options.remove_duplicates {
            QueueStrategy::WithoutDuplicates(RetryQueueWithoutDuplicates::new(
                options.enabled,
                max_size,
            ))
        } else {
            QueueStrategy::WithDuplicates(RetryQueueWithDuplicates::new(options.enabled, max_size))
        };

        Self { options, strategy }
    }

    /// The options this queue was built from, defaults applied.
    pub fn options(&self) -> &RetryQueueOptions {
        &self.options
    }

    /// The underlying queue flavour.
    pub fn strategy(&self) -> &QueueStrategy {
        &self.strategy
    }

    pub fn size(&self) -> usize {
        match &self.strategy {
            QueueStrategy::WithDuplicates(queue) => queue.size(),
            QueueStrategy::WithoutDuplicates(queue) => queue.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn enqueue(&mut self, channel: impl Into<String>, message: Envelope) -> bool {
        match &mut self.strategy {
            QueueStrategy::WithDuplicates(queue) => queue.enqueue(channel, message),
            QueueStrategy::WithoutDuplicates(queue) => queue.enqueue(channel, message),
        }
    }

    pub fn dequeue(&mut self) -> Option<Envelope> {
        match &mut self.strategy {
            QueueStrategy::WithDuplicates(queue) => queue.dequeue(),
            QueueStrategy::WithoutDuplicates(queue) => queue.dequeue(),
        }
    }

    /// Redeliver queued messages oldest first, stopping at the first failure.
    pub async fn process<F, Fut>(&mut self, handler: F) -> usize
    where
        F: FnMut(String, Envelope) -> Fut,
        Fut: Future,
        Fut::Output: RetryOutcome,
    {
        drain(&mut self.strategy, handler).await
    }
}

/// A retry queue behind a lock, shared between a bus and its background
/// retry triggers.
///
/// The lock is only taken for individual queue operations and is never held
/// while a redelivery is awaited, so a publish that fails during a drain can
/// still enqueue.
#[derive(Clone, Debug, Default)]
pub struct SharedRetryQueue {
    inner: Arc<Mutex<RetryQueue>>,
}

impl SharedRetryQueue {
    pub fn new(queue: RetryQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetryQueue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> usize {
        self.lock().size()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn options(&self) -> RetryQueueOptions {
        self.lock().options().clone()
    }

    pub fn enqueue(&self, channel: impl Into<String>, message: Envelope) -> bool {
        self.lock().enqueue(channel, message)
    }

    pub fn dequeue(&self) -> Option<Envelope> {
        self.lock().dequeue()
    }

    /// Run `f` with exclusive access to the queue.
    pub fn with<R>(&self, f: impl FnOnce(&mut RetryQueue) -> R) -> R {
        f(&mut self.lock())
    }

    /// Redeliver queued messages oldest first, stopping at the first failure.
    pub async fn process<F, Fut>(&self, handler: F) -> usize
    where
        F: FnMut(String, Envelope) -> Fut,
        Fut: Future,
        Fut::Output: RetryOutcome,
    {
        drain(&mut Locked(self), handler).await
    }
}

struct Locked<'a>(&'a SharedRetryQueue);

impl DrainSource for Locked<'_> {
    fn front(&mut self) -> Option<RetryEntry> {
        self.0.lock().strategy.front()
    }

    fn acknowledge(&mut self, seq: u64) {
        self.0.lock().strategy.acknowledge(seq);
    }
}
