//! Manager configuration: named transports and their retry options.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::retry_queue::RetryQueueOptions;
use crate::transport::Transport;

/// Builds a fresh transport each time a bus is created for its name.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// One named transport: how to build it and how its bus retries.
#[derive(Clone)]
pub struct TransportConfig {
    pub(crate) factory: TransportFactory,
    pub(crate) retry_queue: RetryQueueOptions,
}

impl TransportConfig {
    pub fn new<F, T>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Transport + 'static,
    {
        Self {
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Transport>),
            retry_queue: RetryQueueOptions::default(),
        }
    }

    pub fn with_retry_queue(mut self, retry_queue: RetryQueueOptions) -> Self {
        self.retry_queue = retry_queue;
        self
    }

    pub fn retry_queue(&self) -> &RetryQueueOptions {
        &self.retry_queue
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("retry_queue", &self.retry_queue)
            .finish_non_exhaustive()
    }
}

/// Configuration for a [`BusManager`](super::BusManager).
///
/// ```
/// use busline::{BusManagerConfig, MemoryHub, RetryQueueOptions, TransportConfig};
///
/// let hub = MemoryHub::new();
/// let config = BusManagerConfig::new()
///     .default_transport("memory")
///     .transport(
///         "memory",
///         TransportConfig::new(move || hub.transport())
///             .with_retry_queue(RetryQueueOptions::new().with_max_size(500)),
///     );
///
/// assert_eq!(config.default_name(), Some("memory"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct BusManagerConfig {
    pub(crate) default: Option<String>,
    pub(crate) transports: HashMap<String, TransportConfig>,
}

impl BusManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used when no transport is given explicitly.
    pub fn default_transport(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Register a named transport.
    pub fn transport(mut self, name: impl Into<String>, config: TransportConfig) -> Self {
        self.transports.insert(name.into(), config);
        self
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Configured transport names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transports.keys().map(String::as_str)
    }
}
