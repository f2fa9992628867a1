//! Счётчик непрочитанных назначений задач.
//!
//! `UnreadWatch` держит подписку на `task_assignments` пользователя и
//! пересчитывает значение после каждого изменения. Подписка живёт ровно
//! столько, сколько сам `UnreadWatch`.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::StoreResult;
use crate::store::{Filter, RemoteStore, Subscription};

/// Все назначения пользователя; по ним слушаем изменения.
pub fn assignments_of(user_id: &str) -> Filter {
    Filter::new().eq("user_id", user_id)
}

/// Непрочитанные назначения пользователя.
pub fn unread_assignments_of(user_id: &str) -> Filter {
    assignments_of(user_id).eq("is_read", "false")
}

#[derive(Clone)]
pub struct UnreadTaskCounter {
    store: Arc<dyn RemoteStore>,
    table: String,
}

impl UnreadTaskCounter {
    pub fn new(store: Arc<dyn RemoteStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub async fn count(&self, user_id: &str) -> StoreResult<u64> {
        self.store
            .count(&self.table, &unread_assignments_of(user_id))
            .await
            .inspect_err(|e| error!("Error fetching unread task count for {}: {}", user_id, e))
    }

    pub async fn watch(&self, user_id: &str) -> StoreResult<UnreadWatch> {
        UnreadWatch::start(self.clone(), user_id).await
    }
}

async fn recount_on_change(
    counter: UnreadTaskCounter,
    user_id: String,
    mut subscription: Subscription,
    publisher: Arc<watch::Sender<u64>>,
) {
    while let Some(change) = subscription.next().await {
        debug!("Change received on {}: {:?}", subscription.table(), change.kind);
        // при ошибке остаётся прежнее значение
        if let Ok(count) = counter.count(&user_id).await {
            publisher.send_replace(count);
        }
    }
}

/// Живой счётчик непрочитанных задач одного пользователя.
pub struct UnreadWatch {
    counter: UnreadTaskCounter,
    user_id: String,
    publisher: Arc<watch::Sender<u64>>,
    count: watch::Receiver<u64>,
    worker: JoinHandle<()>,
}

impl UnreadWatch {
    /// Начальный подсчёт и подписка на изменения назначений пользователя.
    pub async fn start(counter: UnreadTaskCounter, user_id: &str) -> StoreResult<Self> {
        // ошибка уже в логе, начинаем с нуля
        let initial = counter.count(user_id).await.unwrap_or(0);
        let subscription = counter
            .store
            .subscribe(&counter.table, assignments_of(user_id))
            .await?;

        let (publisher, count) = watch::channel(initial);
        let publisher = Arc::new(publisher);
        let worker = tokio::spawn(recount_on_change(
            counter.clone(),
            user_id.to_string(),
            subscription,
            publisher.clone(),
        ));

        info!("Watching unread tasks for {} (currently {})", user_id, initial);
        Ok(Self {
            counter,
            user_id: user_id.to_string(),
            publisher,
            count,
            worker,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn current(&self) -> u64 {
        *self.count.borrow()
    }

    /// Ждёт следующего пересчёта; `None`, если наблюдение остановлено.
    pub async fn changed(&mut self) -> Option<u64> {
        self.count.changed().await.ok()?;
        let count = *self.count.borrow_and_update();
        Some(count)
    }

    /// Пересчёт вне очереди, например после того как задачи прочитаны.
    pub async fn refresh(&self) -> StoreResult<u64> {
        let count = self.counter.count(&self.user_id).await?;
        self.publisher.send_replace(count);
        Ok(count)
    }

    /// Останавливает пересчёт и освобождает подписку.
    pub fn release(self) {}
}

impl Drop for UnreadWatch {
    fn drop(&mut self) {
        self.worker.abort();
        debug!("Stopped watching unread tasks for {}", self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn counts_only_unread_rows_of_the_user() {
        let store = MemoryStore::new();
        for row in [
            json!({"user_id": "u1", "task_id": 1, "is_read": false}),
            json!({"user_id": "u1", "task_id": 2, "is_read": true}),
            json!({"user_id": "u1", "task_id": 3, "is_read": false}),
            json!({"user_id": "u2", "task_id": 1, "is_read": false}),
        ] {
            store.insert("task_assignments", row).await.unwrap();
        }

        let counter = UnreadTaskCounter::new(Arc::new(store), "task_assignments");
        assert_eq!(counter.count("u1").await.unwrap(), 2);
        assert_eq!(counter.count("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn watch_fails_when_subscription_cannot_be_acquired() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let counter = UnreadTaskCounter::new(Arc::new(store), "task_assignments");
        assert!(counter.watch("u1").await.is_err());
    }
}
