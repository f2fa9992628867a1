use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::calendar::collection::{EventCollection, FetchOutcome, MutationOutcome};
use crate::calendar::display::DisplayEvent;
use crate::calendar::draft::{EventDraft, EventMove, FormMode};
use crate::calendar::query::EventQuery;
use crate::error::{CalendarError, StoreError, StoreResult};
use crate::models::{EventPayload, EventRow, RowId};
use crate::store::RemoteStore;

/// Экран календаря: локальная коллекция событий поверх удалённой таблицы.
///
/// После изменений коллекция не перечитывается целиком: локальная запись
/// правится по строке, которую подтвердило хранилище. Неудачные вызовы
/// пишутся в лог, возвращаются вызывающему и коллекцию не меняют.
/// Повторов нет.
pub struct CalendarService {
    store: Arc<dyn RemoteStore>,
    table: String,
    state: Mutex<EventCollection>,
}

impl CalendarService {
    pub fn new(store: Arc<dyn RemoteStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            state: Mutex::new(EventCollection::new()),
        }
    }

    // Блокировка берётся только в синхронных участках, не через await
    fn state(&self) -> MutexGuard<'_, EventCollection> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn logged<T>(&self, action: &str, result: StoreResult<T>) -> Result<T, CalendarError> {
        result.map_err(|e| {
            error!("Error {} event in {}: {}", action, self.table, e);
            CalendarError::Store(e)
        })
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.state().events().to_vec()
    }

    pub fn event(&self, id: &RowId) -> Option<DisplayEvent> {
        self.state().get(id).cloned()
    }

    /// Форма правки, заполненная текущими полями события.
    pub fn begin_edit(&self, id: &RowId) -> Option<EventDraft> {
        self.state().get(id).map(EventDraft::from_event)
    }

    pub async fn fetch(&self, query: &EventQuery) -> Result<FetchOutcome, CalendarError> {
        let stamp = self.state().issue_fetch();
        let result = self.store.select(&self.table, &query.to_filter()).await;
        let rows = self.logged("fetching", result)?;

        let events: Vec<DisplayEvent> = rows
            .into_iter()
            .filter_map(|row| match EventRow::from_value(row) {
                Ok(row) => Some(DisplayEvent::from_row(row)),
                Err(e) => {
                    warn!("Skipping malformed row in {}: {}", self.table, e);
                    None
                }
            })
            .collect();

        let outcome = self.state().apply_fetch(stamp, events);
        match outcome {
            FetchOutcome::Replaced { count } => debug!("Loaded {} events", count),
            FetchOutcome::Superseded => debug!("Discarded superseded fetch #{}", stamp.value()),
        }
        Ok(outcome)
    }

    /// Отправка формы: создание или правка в зависимости от режима.
    pub async fn submit(&self, draft: &EventDraft) -> Result<MutationOutcome, CalendarError> {
        let payload = draft.to_payload().inspect_err(|e| {
            debug!("Event form rejected: {}", e);
        })?;

        match &draft.mode {
            FormMode::Create => self.create(payload).await,
            FormMode::Edit(id) => self.edit(id, payload).await,
        }
    }

    async fn create(&self, payload: EventPayload) -> Result<MutationOutcome, CalendarError> {
        let row = serde_json::to_value(&payload).map_err(StoreError::from)?;
        let stamp = self.state().issue_mutation();

        let result = self.store.insert(&self.table, row).await;
        let created = self.logged("adding", result)?;
        let event = DisplayEvent::from_row(self.logged("adding", EventRow::from_value(created))?);

        info!("Event {} created", event.id);
        let outcome = self.state().apply_created(stamp, event);
        Ok(outcome)
    }

    async fn edit(&self, id: &RowId, payload: EventPayload) -> Result<MutationOutcome, CalendarError> {
        let patch = serde_json::to_value(&payload).map_err(StoreError::from)?;
        let stamp = self.state().issue_mutation();

        let result = self.store.update(&self.table, id, patch).await;
        let confirmed = self.logged("updating", result)?;
        let event = DisplayEvent::from_row(self.logged("updating", EventRow::from_value(confirmed))?);

        let outcome = self.state().apply_replaced(stamp, event);
        debug!("Event {} updated: {:?}", id, outcome);
        Ok(outcome)
    }

    /// Удаление доступно только из формы правки сохранённого события.
    pub async fn delete(&self, draft: &EventDraft) -> Result<MutationOutcome, CalendarError> {
        match &draft.mode {
            FormMode::Edit(id) => self.delete_event(id).await,
            FormMode::Create => Err(CalendarError::NotPersisted),
        }
    }

    pub async fn delete_event(&self, id: &RowId) -> Result<MutationOutcome, CalendarError> {
        let stamp = self.state().issue_mutation();
        let result = self.store.delete(&self.table, id).await;
        self.logged("deleting", result)?;

        info!("Event {} deleted", id);
        let outcome = self.state().apply_removed(stamp, id);
        Ok(outcome)
    }

    /// Перетаскивание, растягивание и программное изменение времени.
    pub async fn reschedule(&self, change: &EventMove) -> Result<MutationOutcome, CalendarError> {
        let patch = change.to_patch()?;
        let patch = serde_json::to_value(&patch).map_err(StoreError::from)?;
        let stamp = self.state().issue_mutation();

        let result = self.store.update(&self.table, &change.id, patch).await;
        let confirmed = self.logged("updating", result)?;
        let row = self.logged("updating", EventRow::from_value(confirmed))?;

        let outcome = self.state().apply_rescheduled(
            stamp,
            &row.id,
            row.start_time,
            row.end_time,
            row.all_day,
        );
        debug!("Event {} moved ({:?}): {:?}", change.id, change.gesture, outcome);
        Ok(outcome)
    }
}
