//! Клиент удалённого табличного хранилища.
//!
//! `RemoteStore` - минимальный набор операций, который нужен экранам
//! дашборда: выборка по фильтру, подсчёт, insert/update/delete по `id`
//! и подписка на изменения строк. Две реализации:
//! - [`RestStore`] ходит в PostgREST по HTTP;
//! - [`MemoryStore`] держит таблицы в памяти процесса (тесты, демо).

pub mod filter;
pub mod memory;
pub mod rest;

pub use filter::{Condition, Filter};
pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::StoreResult;
use crate::models::RowId;

/// Размер буфера событий одной подписки.
pub const SUBSCRIPTION_BUFFER: usize = 64;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Все строки таблицы, подходящие под фильтр, в порядке хранилища.
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Количество строк, подходящих под фильтр.
    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64>;

    /// Вставляет строку и возвращает её вместе с назначенным `id`.
    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value>;

    /// Обновляет строку по `id` и возвращает подтверждённое состояние.
    async fn update(&self, table: &str, id: &RowId, patch: Value) -> StoreResult<Value>;

    async fn delete(&self, table: &str, id: &RowId) -> StoreResult<()>;

    /// Подписка на изменения строк таблицы, подходящих под фильтр.
    async fn subscribe(&self, table: &str, filter: Filter) -> StoreResult<Subscription>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Одно изменение строки. Доставка "хотя бы раз", без гарантий порядка.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// Новое состояние строки (нет для delete).
    pub record: Option<Value>,
    /// Прежнее состояние строки (нет для insert).
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// Изменение касается фильтра, если под него подходит старое или новое состояние.
    pub fn matches(&self, table: &str, filter: &Filter) -> bool {
        if self.table != table {
            return false;
        }
        self.record.iter().chain(self.old.iter()).any(|row| filter.matches(row))
    }
}

/// Живая подписка на изменения.
///
/// Фоновая задача, которая доставляет события, живёт ровно столько же,
/// сколько сам хэндл: `unsubscribe` или drop её останавливают.
pub struct Subscription {
    table: String,
    events: mpsc::Receiver<ChangeEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(
        table: impl Into<String>,
        events: mpsc::Receiver<ChangeEvent>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            table: table.into(),
            events,
            worker: Some(worker),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Следующее изменение; `None`, когда источник закрыт.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            debug!("Subscription on {} released", self.table);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delete_event_matches_by_old_row() {
        let change = ChangeEvent {
            table: "task_assignments".to_string(),
            kind: ChangeKind::Delete,
            record: None,
            old: Some(json!({"id": 1, "user_id": "u1"})),
        };
        let filter = Filter::new().eq("user_id", "u1");

        assert!(change.matches("task_assignments", &filter));
        assert!(!change.matches("events", &filter));
        assert!(!change.matches("task_assignments", &Filter::new().eq("user_id", "u2")));
    }
}
