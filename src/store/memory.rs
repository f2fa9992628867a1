use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::RowId;
use crate::store::{ChangeEvent, ChangeKind, Filter, RemoteStore, Subscription, SUBSCRIPTION_BUFFER};

type Tables = HashMap<String, Vec<Value>>;

/// Хранилище в памяти процесса с лентой изменений.
///
/// Строки хранятся в порядке вставки, `id` назначаются как UUID v4.
/// `set_offline(true)` заставляет все операции падать с `Unavailable`.
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    changes: broadcast::Sender<ChangeEvent>,
    offline: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            changes,
            offline: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Сколько запросов пришло в хранилище (включая неудачные).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Сколько подписок сейчас слушает ленту изменений.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Текущее содержимое таблицы, без учёта запросов.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables().get(table).cloned().unwrap_or_default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: &str, table: &str) -> StoreResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{} on {} while offline", operation, table)));
        }
        Ok(())
    }

    fn publish(&self, table: &str, kind: ChangeKind, record: Option<Value>, old: Option<Value>) {
        // Ошибка означает только отсутствие подписчиков
        let _ = self.changes.send(ChangeEvent {
            table: table.to_string(),
            kind,
            record,
            old,
        });
    }

    fn position(rows: &[Value], id: &RowId) -> Option<usize> {
        rows.iter().position(|row| RowId::from_row(row).as_ref() == Some(id))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.begin("select", table)?;
        Ok(self
            .tables()
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        self.begin("count", table)?;
        Ok(self
            .tables()
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        self.begin("insert", table)?;
        let Value::Object(mut fields) = row else {
            return Err(StoreError::InvalidRow("row must be a JSON object".to_string()));
        };
        if !matches!(fields.get("id"), Some(Value::String(_)) | Some(Value::Number(_))) {
            fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        let created = Value::Object(fields);

        self.tables()
            .entry(table.to_string())
            .or_default()
            .push(created.clone());
        debug!("Inserted row into {}", table);

        self.publish(table, ChangeKind::Insert, Some(created.clone()), None);
        Ok(created)
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> StoreResult<Value> {
        self.begin("update", table)?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::InvalidRow("patch must be a JSON object".to_string()));
        };

        let (old, updated) = {
            let mut tables = self.tables();
            let rows = tables.get_mut(table).ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            })?;
            let index = Self::position(rows, id).ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            })?;

            let old = rows[index].clone();
            if let Value::Object(fields) = &mut rows[index] {
                for (key, value) in patch {
                    // id неизменяем
                    if key != "id" {
                        fields.insert(key, value);
                    }
                }
            }
            (old, rows[index].clone())
        };

        self.publish(table, ChangeKind::Update, Some(updated.clone()), Some(old));
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &RowId) -> StoreResult<()> {
        self.begin("delete", table)?;
        let removed = {
            let mut tables = self.tables();
            tables
                .get_mut(table)
                .and_then(|rows| Self::position(rows, id).map(|index| rows.remove(index)))
        };

        match removed {
            Some(old) => {
                self.publish(table, ChangeKind::Delete, None, Some(old));
                Ok(())
            }
            None => Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            }),
        }
    }

    async fn subscribe(&self, table: &str, filter: Filter) -> StoreResult<Subscription> {
        self.begin("subscribe", table)?;
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let watched = table.to_string();

        let worker = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.matches(&watched, &filter) && tx.send(change).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Subscription on {} lagged, {} changes skipped", watched, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(table, rx, worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_keeps_order() {
        let store = MemoryStore::new();
        let first = store.insert("events", json!({"title": "a"})).await.unwrap();
        store.insert("events", json!({"title": "b"})).await.unwrap();

        assert!(RowId::from_row(&first).is_some());
        let titles: Vec<_> = store.rows("events").iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let store = MemoryStore::new();
        let row = store.insert("events", json!({"title": "a", "category": "meeting"})).await.unwrap();
        let id = RowId::from_row(&row).unwrap();

        let updated = store
            .update("events", &id, json!({"id": "hijack", "category": "other"}))
            .await
            .unwrap();

        assert_eq!(RowId::from_row(&updated), Some(id));
        assert_eq!(updated["title"], json!("a"));
        assert_eq!(updated["category"], json!("other"));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = MemoryStore::new();
        let id = RowId::from("nope");
        assert!(matches!(
            store.delete("events", &id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update("events", &id, json!({})).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn offline_store_counts_but_rejects_requests() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let result = store.select("events", &Filter::new()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn subscription_delivers_only_matching_changes() {
        let store = MemoryStore::new();
        let mut subscription = store
            .subscribe("task_assignments", Filter::new().eq("user_id", "u1"))
            .await
            .unwrap();

        store.insert("task_assignments", json!({"user_id": "u2"})).await.unwrap();
        store.insert("events", json!({"user_id": "u1"})).await.unwrap();
        store.insert("task_assignments", json!({"user_id": "u1"})).await.unwrap();

        let change = subscription.next().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.record.unwrap()["user_id"], json!("u1"));
        subscription.unsubscribe();
    }
}
