use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use studio_desk::models::RowId;
use studio_desk::services::{UnreadTaskCounter, UnreadWatch};
use studio_desk::store::{MemoryStore, RemoteStore};

const TABLE: &str = "task_assignments";

async fn next_count(watch: &mut UnreadWatch) -> u64 {
    tokio::time::timeout(Duration::from_secs(1), watch.changed())
        .await
        .expect("no recount within a second")
        .expect("watch stopped")
}

#[tokio::test]
async fn watch_recounts_after_each_change_of_the_user() {
    let store = MemoryStore::new();
    store
        .insert(TABLE, json!({"user_id": "u1", "task_id": 1, "is_read": false}))
        .await
        .unwrap();

    let counter = UnreadTaskCounter::new(Arc::new(store.clone()), TABLE);
    let mut watch = UnreadWatch::start(counter, "u1").await.unwrap();
    assert_eq!(watch.current(), 1);

    let assigned = store
        .insert(TABLE, json!({"user_id": "u1", "task_id": 2, "is_read": false}))
        .await
        .unwrap();
    assert_eq!(next_count(&mut watch).await, 2);

    let id = RowId::from_row(&assigned).unwrap();
    store.update(TABLE, &id, json!({"is_read": true})).await.unwrap();
    assert_eq!(next_count(&mut watch).await, 1);
}

#[tokio::test]
async fn changes_of_other_users_are_ignored() {
    let store = MemoryStore::new();
    let counter = UnreadTaskCounter::new(Arc::new(store.clone()), TABLE);
    let mut watch = counter.watch("u1").await.unwrap();

    store
        .insert(TABLE, json!({"user_id": "u2", "task_id": 1, "is_read": false}))
        .await
        .unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(100), watch.changed()).await;
    assert!(waited.is_err());
    assert_eq!(watch.current(), 0);
}

#[tokio::test]
async fn failed_recount_keeps_previous_value() {
    let store = MemoryStore::new();
    store
        .insert(TABLE, json!({"user_id": "u1", "is_read": false}))
        .await
        .unwrap();
    let counter = UnreadTaskCounter::new(Arc::new(store.clone()), TABLE);
    let watch = counter.watch("u1").await.unwrap();

    store.set_offline(true);
    assert!(watch.refresh().await.is_err());
    assert_eq!(watch.current(), 1);

    store.set_offline(false);
    assert_eq!(watch.refresh().await.unwrap(), 1);
}

#[tokio::test]
async fn release_drops_the_subscription() {
    let store = MemoryStore::new();
    let counter = UnreadTaskCounter::new(Arc::new(store.clone()), TABLE);
    let watch = counter.watch("u1").await.unwrap();
    assert_eq!(store.subscriber_count(), 1);

    watch.release();
    for _ in 0..50 {
        if store.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.subscriber_count(), 0);
}
