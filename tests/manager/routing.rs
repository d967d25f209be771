use busline::MemoryHub;
use serde_json::json;

use crate::support::{manager, Received};

#[tokio::test]
async fn named_buses_exchange_messages() {
    let hub = MemoryHub::new();
    let manager = manager(&hub);

    let received = Received::default();
    manager
        .use_transport(Some("memory1"))
        .unwrap()
        .subscribe("news", received.handler())
        .await
        .unwrap();

    assert!(manager.publish("news", "hello").await.unwrap());
    assert_eq!(received.messages(), vec![json!("hello")]);
}

#[tokio::test]
async fn default_bus_skips_its_own_messages() {
    let hub = MemoryHub::new();
    let manager = manager(&hub);

    let received = Received::default();
    manager.subscribe("news", received.handler()).await.unwrap();

    manager.publish("news", "echo").await.unwrap();
    assert!(received.messages().is_empty());
}

#[tokio::test]
async fn separate_managers_share_a_hub() {
    let hub = MemoryHub::new();
    let orders = manager(&hub);
    let billing = manager(&hub);

    let received = Received::default();
    billing.subscribe("orders", received.handler()).await.unwrap();

    orders.publish("orders", json!({ "id": 1 })).await.unwrap();
    assert_eq!(received.messages(), vec![json!({ "id": 1 })]);

    billing.unsubscribe("orders").await.unwrap();
    orders.publish("orders", json!({ "id": 2 })).await.unwrap();
    assert_eq!(received.messages().len(), 1);

    orders.disconnect().await.unwrap();
    billing.disconnect().await.unwrap();
}
