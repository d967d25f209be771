use std::time::Duration;

use busline::{MemoryHub, RetryQueueOptions};
use serde_json::json;

use crate::support::{chaos_bus, memory_bus, Received};

#[tokio::test]
async fn reconnect_triggers_retry() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    switch.always_fail();
    publisher.publish("c", "after reconnect").await;

    switch.never_fail();
    assert!(switch.trigger_reconnect());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(received.messages(), vec![json!("after reconnect")]);
    assert!(publisher.retry_queue().is_empty());
}

#[tokio::test]
async fn reconnect_while_still_failing_keeps_queue() {
    let hub = MemoryHub::new();
    let (bus, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    switch.always_fail();
    bus.publish("c", "waiting").await;

    assert!(switch.trigger_reconnect());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(bus.retry_queue().size(), 1);
}

#[tokio::test]
async fn reconnect_after_bus_dropped_is_ignored() {
    let hub = MemoryHub::new();
    let (bus, switch) = chaos_bus(&hub, RetryQueueOptions::new());
    drop(bus);

    assert!(switch.trigger_reconnect());
    tokio::time::sleep(Duration::from_millis(10)).await;
}
