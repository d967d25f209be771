use std::sync::{Arc, Mutex};
use std::time::Duration;

use busline::{MemoryHub, RetryQueueOptions};
use serde_json::json;

use crate::support::{chaos_bus, memory_bus, Received};

#[tokio::test]
async fn retries_on_interval() {
    let hub = MemoryHub::new();
    let options = RetryQueueOptions::new().with_retry_interval("100ms");
    let (subscriber, subscriber_switch) = chaos_bus(&hub, options.clone());
    let (publisher, publisher_switch) = chaos_bus(&hub, options);
    subscriber_switch.always_fail();
    publisher_switch.always_fail();

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    assert!(!publisher.publish("c", "eventually").await);
    assert_eq!(received.count(), 0);

    publisher_switch.never_fail();
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(received.messages(), vec![json!("eventually")]);
    assert!(publisher.retry_queue().is_empty());

    publisher.disconnect().await.unwrap();
    subscriber.disconnect().await.unwrap();
}

#[tokio::test]
async fn retries_when_asked() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    switch.always_fail();
    publisher.publish("c", "later").await;
    assert_eq!(received.count(), 0);

    switch.never_fail();
    assert_eq!(publisher.process_error_retry_queue().await, 1);
    assert_eq!(received.messages(), vec![json!("later")]);
}

#[tokio::test]
async fn no_retry_when_queue_disabled() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(
        &hub,
        RetryQueueOptions::new()
            .with_enabled(false)
            .with_retry_interval("50ms"),
    );

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    switch.always_fail();
    publisher.publish("c", "gone").await;
    switch.never_fail();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(publisher.process_error_retry_queue().await, 0);
    assert_eq!(received.count(), 0);

    publisher.disconnect().await.unwrap();
}

#[tokio::test]
async fn keeps_message_when_retry_fails() {
    let hub = MemoryHub::new();
    let (bus, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    switch.always_fail();
    bus.publish("c", "stuck").await;

    assert_eq!(bus.process_error_retry_queue().await, 0);
    assert_eq!(bus.retry_queue().size(), 1);
}

#[tokio::test]
async fn drain_preserves_publish_order() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    switch.always_fail();
    for n in 1..=3 {
        publisher.publish("c", n).await;
    }

    switch.never_fail();
    assert_eq!(publisher.process_error_retry_queue().await, 3);
    assert_eq!(received.messages(), vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn full_queue_keeps_newest_messages() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new().with_max_size(2));

    let received = Received::new();
    subscriber.subscribe("c", received.handler()).await.unwrap();

    switch.always_fail();
    for n in 1..=3 {
        publisher.publish("c", n).await;
    }
    assert_eq!(publisher.retry_queue().size(), 2);

    switch.never_fail();
    publisher.process_error_retry_queue().await;
    assert_eq!(received.messages(), vec![json!(2), json!(3)]);
}

#[tokio::test]
async fn queued_messages_keep_their_channel() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    let orders = Received::new();
    let payments = Received::new();
    subscriber.subscribe("orders", orders.handler()).await.unwrap();
    subscriber.subscribe("payments", payments.handler()).await.unwrap();

    switch.always_fail();
    publisher.publish("orders", "order").await;
    publisher.publish("payments", "payment").await;

    switch.never_fail();
    publisher.process_error_retry_queue().await;

    assert_eq!(orders.messages(), vec![json!("order")]);
    assert_eq!(payments.messages(), vec![json!("payment")]);
}

#[tokio::test]
async fn inbound_message_triggers_retry() {
    let hub = MemoryHub::new();
    let listener = memory_bus(&hub);
    let (relay, relay_switch) = chaos_bus(&hub, RetryQueueOptions::new());
    let sender = memory_bus(&hub);

    let on_listener = Received::new();
    let on_relay = Received::new();
    listener.subscribe("out", on_listener.handler()).await.unwrap();
    relay.subscribe("in", on_relay.handler()).await.unwrap();

    relay_switch.always_fail();
    relay.publish("out", "queued").await;
    assert_eq!(on_listener.count(), 0);

    relay_switch.never_fail();
    sender.publish("in", "wake up").await;

    assert_eq!(on_relay.messages(), vec![json!("wake up")]);
    assert_eq!(on_listener.messages(), vec![json!("queued")]);
    assert!(relay.retry_queue().is_empty());
}

#[tokio::test]
async fn concurrent_drains_deliver_each_message_once() {
    let hub = MemoryHub::new();
    let subscriber = memory_bus(&hub);
    let (publisher, switch) = chaos_bus(&hub, RetryQueueOptions::new());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    subscriber
        .subscribe("c", move |payload| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                sink.lock().unwrap().push(payload);
            }
        })
        .await
        .unwrap();

    switch.always_fail();
    publisher.publish("c", 1).await;
    publisher.publish("c", 2).await;
    switch.never_fail();

    let (first, second) = tokio::join!(
        publisher.process_error_retry_queue(),
        publisher.process_error_retry_queue()
    );

    let mut counts = [first, second];
    counts.sort_unstable();
    assert_eq!(counts, [0, 2]);
    assert_eq!(*received.lock().unwrap(), vec![json!(1), json!(2)]);
    assert!(publisher.retry_queue().is_empty());
}
