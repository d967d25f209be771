//! Bus manager - named transports, one cached bus per name.

mod config;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

pub use config::{BusManagerConfig, TransportConfig, TransportFactory};

use crate::bus::{Bus, BusOptions};
use crate::error::BusError;
use crate::message::Message;

/// Registry that lazily builds and caches one [`Bus`] per configured
/// transport name.
///
/// The convenience methods (`publish`, `subscribe`, ...) act on the default
/// transport.
///
/// ## Example
///
/// ```
/// use busline::{BusManager, BusManagerConfig, MemoryHub, TransportConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), busline::BusError> {
/// let hub = MemoryHub::new();
/// let manager = BusManager::new(
///     BusManagerConfig::new()
///         .default_transport("memory")
///         .transport("memory", TransportConfig::new(move || hub.transport())),
/// );
///
/// let bus = manager.use_transport(Some("memory"))?;
/// assert_eq!(bus.id(), manager.default_bus()?.id());
///
/// manager.publish("news", "hello").await?;
/// # Ok(())
/// # }
/// ```
pub struct BusManager {
    config: BusManagerConfig,
    cache: Mutex<HashMap<String, Bus>>,
}

impl BusManager {
    pub fn new(config: BusManagerConfig) -> Self {
        debug!(
            default = ?config.default,
            transports = config.transports.len(),
            "creating bus manager"
        );
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BusManagerConfig {
        &self.config
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Bus>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the bus for a transport name, or for the default transport when
    /// `name` is `None`. The bus is created on first use and cached.
    pub fn use_transport(&self, name: Option<&str>) -> Result<Bus, BusError> {
        let name = name
            .or(self.config.default.as_deref())
            .ok_or(BusError::NoDefaultTransport)?;

        let mut cache = self.cache();
        if let Some(bus) = cache.get(name) {
            debug!(transport = name, "returning cached bus instance");
            return Ok(bus.clone());
        }

        let transport = self
            .config
            .transports
            .get(name)
            .ok_or_else(|| BusError::UnknownTransport(name.to_string()))?;

        debug!(transport = name, "creating new bus instance");
        let bus = Bus::from_boxed(
            (transport.factory)(),
            BusOptions::from(transport.retry_queue.clone()),
        )?;
        cache.insert(name.to_string(), bus.clone());

        Ok(bus)
    }

    /// The bus for the default transport.
    pub fn default_bus(&self) -> Result<Bus, BusError> {
        self.use_transport(None)
    }

    pub async fn publish(&self, channel: &str, message: impl Into<Message>) -> Result<bool, BusError> {
        let bus = self.default_bus()?;
        Ok(bus.publish(channel, message).await)
    }

    pub async fn subscribe<F, Fut>(&self, channel: &str, handler: F) -> Result<(), BusError>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.default_bus()?.subscribe(channel, handler).await
    }

    pub async fn unsubscribe(&self, channel: &str) -> Result<(), BusError> {
        self.default_bus()?.unsubscribe(channel).await
    }

    /// Disconnect the default bus.
    pub async fn disconnect(&self) -> Result<(), BusError> {
        self.default_bus()?.disconnect().await
    }

    /// Disconnect every bus created so far and forget them.
    ///
    /// The next `use_transport` builds fresh buses. Every bus is
    /// disconnected even if one fails; the first error is returned.
    pub async fn disconnect_all(&self) -> Result<(), BusError> {
        let buses: Vec<Bus> = self.cache().drain().map(|(_, bus)| bus).collect();

        let mut first_error = None;
        for bus in buses {
            if let Err(err) = bus.disconnect().await {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
