use std::sync::{Arc, Mutex};

use busline::{BusManager, BusManagerConfig, MemoryHub, Message, TransportConfig};

#[derive(Clone, Default)]
pub struct Received(Arc<Mutex<Vec<Message>>>);

impl Received {
    pub fn handler(
        &self,
    ) -> impl Fn(Message) -> std::future::Ready<()> + Send + Sync + 'static {
        let messages = Arc::clone(&self.0);
        move |payload| {
            messages.lock().unwrap().push(payload);
            std::future::ready(())
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.lock().unwrap().clone()
    }
}

pub fn memory_config(hub: &MemoryHub) -> TransportConfig {
    let hub = hub.clone();
    TransportConfig::new(move || hub.transport())
}

/// A manager with `memory` (default) and `memory1`, both on `hub`.
pub fn manager(hub: &MemoryHub) -> BusManager {
    BusManager::new(
        BusManagerConfig::new()
            .default_transport("memory")
            .transport("memory", memory_config(hub))
            .transport("memory1", memory_config(hub)),
    )
}
