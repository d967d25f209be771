use busline::{Envelope, MemoryHub, RetryQueueOptions, Transport};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::support::{chaos_bus, memory_bus, Received};

#[tokio::test]
async fn bus_does_not_receive_its_own_messages() {
    let hub = MemoryHub::new();
    let a = memory_bus(&hub);
    let b = memory_bus(&hub);

    let on_a = Received::new();
    let on_b = Received::new();
    a.subscribe("c", on_a.handler()).await.unwrap();
    b.subscribe("c", on_b.handler()).await.unwrap();

    assert!(a.publish("c", json!({ "n": 1 })).await);

    assert_eq!(on_a.count(), 0);
    assert_eq!(on_b.messages(), vec![json!({ "n": 1 })]);
}

#[tokio::test]
async fn bus_drops_envelopes_stamped_with_its_id() {
    let hub = MemoryHub::new();
    let bus = memory_bus(&hub);

    let received = Received::new();
    bus.subscribe("c", received.handler()).await.unwrap();

    // A transport with another identity relays an envelope carrying the
    // bus's own id, so only the bus can filter it out.
    let relay = hub.transport().with_id("relay");
    relay
        .publish("c", &Envelope::new(bus.id(), json!("echo")))
        .await
        .unwrap();
    assert_eq!(received.count(), 0);

    relay
        .publish("c", &Envelope::new("someone-else", json!("hello")))
        .await
        .unwrap();
    assert_eq!(received.messages(), vec![json!("hello")]);
}

#[tokio::test]
async fn publish_and_unsubscribe_end_to_end() {
    let hub = MemoryHub::new();
    let publisher = memory_bus(&hub);
    let subscriber = memory_bus(&hub);

    let received = Received::new();
    subscriber.subscribe("news", received.handler()).await.unwrap();

    assert!(publisher.publish("news", "hello").await);
    assert_eq!(received.messages(), vec![json!("hello")]);

    subscriber.unsubscribe("news").await.unwrap();
    assert!(publisher.publish("news", "again").await);
    assert_eq!(received.count(), 1);
}

#[tokio::test]
async fn other_channels_are_not_delivered() {
    let hub = MemoryHub::new();
    let publisher = memory_bus(&hub);
    let subscriber = memory_bus(&hub);

    let received = Received::new();
    subscriber.subscribe("orders", received.handler()).await.unwrap();

    publisher.publish("payments", "paid").await;
    assert_eq!(received.count(), 0);
}

#[tokio::test]
async fn every_subscribed_bus_receives_a_copy() {
    let hub = MemoryHub::new();
    let publisher = memory_bus(&hub);
    let first = memory_bus(&hub);
    let second = memory_bus(&hub);

    let on_first = Received::new();
    let on_second = Received::new();
    first.subscribe("c", on_first.handler()).await.unwrap();
    second.subscribe("c", on_second.handler()).await.unwrap();

    publisher.publish("c", 7).await;

    assert_eq!(on_first.messages(), vec![json!(7)]);
    assert_eq!(on_second.messages(), vec![json!(7)]);
}

#[tokio::test]
async fn subscribe_json_delivers_typed_payloads() {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderCreated {
        id: u64,
        total: u32,
    }

    let hub = MemoryHub::new();
    let publisher = memory_bus(&hub);
    let subscriber = memory_bus(&hub);

    let orders = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&orders);
    subscriber
        .subscribe_json("orders.created", move |order: OrderCreated| {
            sink.lock().unwrap().push(order);
            async {}
        })
        .await
        .unwrap();

    let order = OrderCreated { id: 42, total: 1999 };
    assert!(publisher.publish_json("orders.created", &order).await.unwrap());
    publisher.publish("orders.created", "not an order").await;

    assert_eq!(*orders.lock().unwrap(), vec![order]);
}

#[tokio::test]
async fn failed_publish_returns_false_and_queues() {
    let hub = MemoryHub::new();
    let (bus, switch) = chaos_bus(&hub, RetryQueueOptions::new().with_remove_duplicates(false));

    switch.always_fail();
    assert!(!bus.publish("c", "one").await);
    assert!(!bus.publish("c", "one").await);
    assert_eq!(bus.retry_queue().size(), 2);

    switch.never_fail();
    assert!(bus.publish("c", "two").await);
    assert_eq!(bus.retry_queue().size(), 2);
}

#[tokio::test]
async fn disabled_queue_drops_failed_publishes() {
    let hub = MemoryHub::new();
    let (bus, switch) = chaos_bus(&hub, RetryQueueOptions::new().with_enabled(false));

    switch.always_fail();
    assert!(!bus.publish("c", "lost").await);
    assert!(bus.retry_queue().is_empty());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let hub = MemoryHub::new();
    let (bus, _) = chaos_bus(&hub, RetryQueueOptions::new().with_retry_interval("1s"));
    bus.subscribe("c", Received::new().handler()).await.unwrap();
    assert_eq!(hub.subscriber_count("c"), 1);

    bus.disconnect().await.unwrap();
    bus.disconnect().await.unwrap();

    assert_eq!(hub.subscriber_count("c"), 0);
    assert!(!bus.has_retry_timer());
}
