//! The bus: one transport, one identity, one retry queue.

use std::fmt;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::options::BusOptions;
use super::schedule::{DrainGuard, RetryTask};
use crate::error::BusError;
use crate::message::{Envelope, Message};
use crate::retry_queue::{RetryQueue, SharedRetryQueue};
use crate::transport::{envelope_handler, ReconnectCallback, Transport};

pub(crate) struct BusInner {
    id: String,
    transport: Box<dyn Transport>,
    retry_queue: SharedRetryQueue,
    draining: AtomicBool,
    retry_task: RetryTask,
}

impl BusInner {
    async fn publish(&self, channel: &str, message: Message) -> bool {
        let envelope = Envelope::new(self.id.as_str(), message);
        debug!(bus_id = %self.id, channel = channel, "publishing message");

        match self.transport.publish(channel, &envelope).await {
            Ok(()) => true,
            Err(err) => {
                debug!(
                    bus_id = %self.id,
                    channel = channel,
                    error = %err,
                    "error publishing message, retrying later"
                );

                if self.retry_queue.enqueue(channel, envelope) {
                    debug!(
                        bus_id = %self.id,
                        size = self.retry_queue.size(),
                        "added message to error retry queue"
                    );
                }
                false
            }
        }
    }

    pub(crate) async fn process_error_retry_queue(&self) -> usize {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            trace!(bus_id = %self.id, "error retry queue already being processed");
            return 0;
        };

        let size = self.retry_queue.size();
        if size == 0 {
            return 0;
        }
        debug!(bus_id = %self.id, size = size, "start error retry queue processing");

        // Queued envelopes already carry this bus's id. A failed resend must
        // not enqueue again: the entry is still at the head of the queue.
        let delivered = self
            .retry_queue
            .process(|channel, envelope| async move {
                self.transport.publish(&channel, &envelope).await
            })
            .await;

        debug!(
            bus_id = %self.id,
            delivered = delivered,
            remaining = self.retry_queue.size(),
            "error retry queue processed"
        );
        delivered
    }
}

fn reconnect_callback(bus: Weak<BusInner>, runtime: Option<Handle>) -> ReconnectCallback {
    Arc::new(move || {
        let Some(bus) = bus.upgrade() else {
            return;
        };
        debug!(
            bus_id = %bus.id,
            transport = bus.transport.name(),
            "bus transport reconnected"
        );

        match runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                runtime.spawn(async move {
                    bus.process_error_retry_queue().await;
                });
            }
            None => warn!(
                bus_id = %bus.id,
                "no Tokio runtime available, skipping retry after reconnect"
            ),
        }
    })
}

/// A publish/subscribe endpoint bound to one transport.
///
/// Publishing never fails loudly: when the transport rejects a message the
/// bus parks it in its retry queue and reports `false`. Queued messages are
/// redelivered whenever the bus sees a sign of transport liveness (an
/// inbound message or a reconnect), on a timer if one is configured, or on
/// demand through [`process_error_retry_queue`](Bus::process_error_retry_queue).
///
/// Cloning a bus yields another handle to the same instance.
///
/// ## Example
///
/// ```
/// use busline::{Bus, BusOptions, MemoryHub, RetryQueueOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), busline::BusError> {
/// let hub = MemoryHub::new();
/// let options = BusOptions::new()
///     .with_retry_queue(RetryQueueOptions::new().with_max_size(1_000).with_retry_interval("5s"));
///
/// let orders = Bus::new(hub.transport(), options.clone())?;
/// let billing = Bus::new(hub.transport(), options)?;
///
/// billing
///     .subscribe("orders.created", |payload| async move {
///         println!("bill order {}", payload["id"]);
///     })
///     .await?;
///
/// orders.publish("orders.created", serde_json::json!({ "id": 42 })).await;
///
/// orders.disconnect().await?;
/// billing.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// Create a bus over the given transport.
    ///
    /// Fails if the retry interval is invalid, or if one is configured
    /// while no Tokio runtime is running.
    pub fn new(transport: impl Transport + 'static, options: BusOptions) -> Result<Self, BusError> {
        Self::from_boxed(Box::new(transport), options)
    }

    /// Create a bus over an already boxed transport.
    pub fn from_boxed(
        mut transport: Box<dyn Transport>,
        options: BusOptions,
    ) -> Result<Self, BusError> {
        let period = options.retry_queue.retry_interval.resolve()?;
        let runtime = Handle::try_current().ok();
        if period.is_some() && runtime.is_none() {
            return Err(BusError::RuntimeUnavailable);
        }

        let id = Uuid::new_v4().to_string();
        transport.set_id(&id);

        let retry_queue = SharedRetryQueue::new(RetryQueue::new(options.retry_queue));
        let inner = Arc::new_cyclic(|weak: &Weak<BusInner>| {
            transport.on_reconnect(reconnect_callback(weak.clone(), runtime.clone()));
            BusInner {
                id,
                transport,
                retry_queue,
                draining: AtomicBool::new(false),
                retry_task: RetryTask::default(),
            }
        });

        if let (Some(period), Some(runtime)) = (period, runtime.as_ref()) {
            inner
                .retry_task
                .start(runtime, Arc::downgrade(&inner), period);
            debug!(bus_id = %inner.id, period = ?period, "error retry timer started");
        }

        debug!(
            bus_id = %inner.id,
            transport = inner.transport.name(),
            "bus created"
        );
        Ok(Self { inner })
    }

    /// This bus's identity, unique per instance.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn transport_name(&self) -> &'static str {
        self.inner.transport.name()
    }

    /// The retry queue holding publishes that failed.
    pub fn retry_queue(&self) -> &SharedRetryQueue {
        &self.inner.retry_queue
    }

    /// Whether the periodic retry task is running.
    pub fn has_retry_timer(&self) -> bool {
        self.inner.retry_task.is_running()
    }

    /// Publish a message on a channel.
    ///
    /// Returns `true` if the transport accepted it. On failure the message is
    /// queued for retry (unless the queue is disabled or already holds the
    /// same payload) and `false` is returned.
    pub async fn publish(&self, channel: &str, message: impl Into<Message>) -> bool {
        self.inner.publish(channel, message.into()).await
    }

    /// Serialize a value and publish it.
    ///
    /// Only a serialization failure is an error; the boolean has the same
    /// meaning as for [`publish`](Bus::publish).
    pub async fn publish_json<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        value: &T,
    ) -> Result<bool, BusError> {
        let message = serde_json::to_value(value)?;
        Ok(self.inner.publish(channel, message).await)
    }

    /// Subscribe to a channel.
    ///
    /// Every inbound message first triggers a drain of the retry queue, then
    /// `handler` runs with the payload. Messages published by this bus are
    /// never delivered to it.
    pub async fn subscribe<F, Fut>(&self, channel: &str, handler: F) -> Result<(), BusError>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(bus_id = %self.inner.id, channel = channel, "subscribing to channel");

        let bus = Arc::downgrade(&self.inner);
        let handler = Arc::new(handler);
        let wrapped = envelope_handler(move |envelope: Envelope| {
            let bus = bus.clone();
            let handler = Arc::clone(&handler);
            async move {
                let Some(bus) = bus.upgrade() else {
                    return;
                };
                if envelope.is_from(&bus.id) {
                    trace!(bus_id = %bus.id, "ignoring message published by this bus");
                    return;
                }

                bus.process_error_retry_queue().await;

                debug!(bus_id = %bus.id, from = %envelope.bus_id, "received message from bus");
                (*handler)(envelope.payload).await;
            }
        });

        self.inner.transport.subscribe(channel, wrapped).await?;
        Ok(())
    }

    /// Subscribe with payloads deserialized into `T`.
    ///
    /// Payloads that do not deserialize are logged and skipped.
    pub async fn subscribe_json<T, F, Fut>(&self, channel: &str, handler: F) -> Result<(), BusError>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let channel_name = channel.to_string();
        self.subscribe(channel, move |payload| {
            let handler = Arc::clone(&handler);
            let channel = channel_name.clone();
            async move {
                match serde_json::from_value::<T>(payload) {
                    Ok(value) => (*handler)(value).await,
                    Err(err) => warn!(
                        channel = %channel,
                        error = %err,
                        "dropping message that does not match the expected type"
                    ),
                }
            }
        })
        .await
    }

    /// Redeliver queued messages now, oldest first, stopping at the first
    /// failure.
    ///
    /// Each queued envelope is sent straight to the transport rather than
    /// through [`publish`](Bus::publish). A failed resend leaves the entry at
    /// the head of the queue and never adds a second copy, even when
    /// duplicates are allowed.
    ///
    /// Returns the number of messages redelivered. If a drain is already
    /// running on this bus, returns `0` immediately.
    pub async fn process_error_retry_queue(&self) -> usize {
        self.inner.process_error_retry_queue().await
    }

    pub async fn unsubscribe(&self, channel: &str) -> Result<(), BusError> {
        debug!(bus_id = %self.inner.id, channel = channel, "unsubscribing from channel");
        self.inner.transport.unsubscribe(channel).await?;
        Ok(())
    }

    /// Stop the retry timer and disconnect the transport.
    ///
    /// Calling it again is harmless.
    pub async fn disconnect(&self) -> Result<(), BusError> {
        if self.inner.retry_task.abort() {
            debug!(bus_id = %self.inner.id, "error retry timer cancelled");
        }
        self.inner.transport.disconnect().await?;
        Ok(())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.inner.id)
            .field("transport", &self.inner.transport.name())
            .field("retry_queue_size", &self.inner.retry_queue.size())
            .finish()
    }
}
