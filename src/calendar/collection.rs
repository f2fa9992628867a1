//! Локальная коллекция событий с отметками порядка.
//!
//! Каждый запрос (выборка или изменение) получает отметку из одного
//! монотонного счётчика до обращения к хранилищу. Ответ применяется,
//! только если он не устарел:
//! - выборка заменяет коллекцию, только если она последняя из выданных;
//! - изменение записи применяется, только если его отметка новее той,
//!   что последней записала эту запись;
//! - выборка не откатывает записи, подтверждённые после её выдачи, и не
//!   возвращает записи, удалённые после её выдачи.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calendar::display::DisplayEvent;
use crate::models::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum FetchOutcome {
    Replaced { count: usize },
    /// После этой выборки была выдана более новая; ответ отброшен.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOutcome {
    Applied,
    /// Запись уже изменена более новым ответом.
    Stale,
    /// Записи нет в локальной коллекции.
    Missing,
}

#[derive(Debug, Default)]
pub struct EventCollection {
    events: Vec<DisplayEvent>,
    clock: u64,
    latest_fetch: Option<Stamp>,
    /// Отметки подтверждённых удалений, ещё не перекрытых выборкой.
    removed: HashMap<RowId, u64>,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> Stamp {
        self.clock += 1;
        Stamp(self.clock)
    }

    fn position(&self, id: &RowId) -> Option<usize> {
        self.events.iter().position(|event| &event.id == id)
    }

    pub fn issue_fetch(&mut self) -> Stamp {
        let stamp = self.tick();
        self.latest_fetch = Some(stamp);
        stamp
    }

    pub fn issue_mutation(&mut self) -> Stamp {
        self.tick()
    }

    pub fn apply_fetch(&mut self, stamp: Stamp, events: Vec<DisplayEvent>) -> FetchOutcome {
        if self.latest_fetch != Some(stamp) {
            return FetchOutcome::Superseded;
        }

        let fetched: HashSet<RowId> = events.iter().map(|event| event.id.clone()).collect();
        let mut merged: Vec<DisplayEvent> = Vec::with_capacity(events.len());
        for mut event in events {
            if self.removed.get(&event.id).is_some_and(|&removed| removed > stamp.0) {
                continue;
            }
            match self.get(&event.id) {
                Some(local) if local.version > stamp.0 => merged.push(local.clone()),
                _ => {
                    event.version = stamp.0;
                    merged.push(event);
                }
            }
        }

        // подтверждённые после выдачи выборки, но в неё не попавшие
        merged.extend(
            self.events
                .iter()
                .filter(|local| local.version > stamp.0 && !fetched.contains(&local.id))
                .cloned(),
        );

        self.removed.retain(|_, removed| *removed > stamp.0);
        self.events = merged;
        FetchOutcome::Replaced {
            count: self.events.len(),
        }
    }

    /// Созданное событие добавляется в конец. Если более новая выборка
    /// уже принесла его, дубликат не появляется.
    pub fn apply_created(&mut self, stamp: Stamp, mut event: DisplayEvent) -> MutationOutcome {
        event.version = stamp.0;
        match self.position(&event.id) {
            Some(index) if self.events[index].version >= stamp.0 => MutationOutcome::Stale,
            Some(index) => {
                self.events[index] = event;
                MutationOutcome::Applied
            }
            None => {
                self.events.push(event);
                MutationOutcome::Applied
            }
        }
    }

    /// Замена записи на месте, позиция сохраняется.
    pub fn apply_replaced(&mut self, stamp: Stamp, mut event: DisplayEvent) -> MutationOutcome {
        let Some(index) = self.position(&event.id) else {
            return MutationOutcome::Missing;
        };
        if self.events[index].version >= stamp.0 {
            return MutationOutcome::Stale;
        }

        event.version = stamp.0;
        self.events[index] = event;
        MutationOutcome::Applied
    }

    /// Новое время и флаг "весь день"; остальные поля не трогаем.
    pub fn apply_rescheduled(
        &mut self,
        stamp: Stamp,
        id: &RowId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
    ) -> MutationOutcome {
        let Some(index) = self.position(id) else {
            return MutationOutcome::Missing;
        };
        let event = &mut self.events[index];
        if event.version >= stamp.0 {
            return MutationOutcome::Stale;
        }

        event.start = start;
        event.end = end;
        event.all_day = all_day;
        event.recolor();
        event.version = stamp.0;
        MutationOutcome::Applied
    }

    /// Подтверждённое удаление выигрывает у любой версии. Более ранняя
    /// выборка, пришедшая позже, запись не вернёт.
    pub fn apply_removed(&mut self, stamp: Stamp, id: &RowId) -> MutationOutcome {
        let removed = self.removed.entry(id.clone()).or_insert(stamp.0);
        *removed = (*removed).max(stamp.0);

        match self.position(id) {
            Some(index) => {
                self.events.remove(index);
                MutationOutcome::Applied
            }
            None => MutationOutcome::Missing,
        }
    }

    pub fn get(&self, id: &RowId) -> Option<&DisplayEvent> {
        self.events.iter().find(|event| &event.id == id)
    }

    pub fn events(&self) -> &[DisplayEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRow;

    fn event(id: i64, title: &str) -> DisplayEvent {
        DisplayEvent::from_row(EventRow {
            id: RowId::from(id),
            title: title.to_string(),
            description: None,
            location: None,
            start_time: "2024-01-05T10:00:00Z".parse().unwrap(),
            end_time: "2024-01-05T11:00:00Z".parse().unwrap(),
            category: Some("meeting".to_string()),
            all_day: false,
        })
    }

    fn titles(collection: &EventCollection) -> Vec<&str> {
        collection.events().iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn late_response_of_older_fetch_is_discarded() {
        let mut collection = EventCollection::new();
        let older = collection.issue_fetch();
        let newer = collection.issue_fetch();

        assert_eq!(
            collection.apply_fetch(newer, vec![event(1, "fresh")]),
            FetchOutcome::Replaced { count: 1 }
        );
        assert_eq!(
            collection.apply_fetch(older, vec![event(2, "stale"), event(3, "stale")]),
            FetchOutcome::Superseded
        );
        assert_eq!(titles(&collection), vec!["fresh"]);
    }

    #[test]
    fn out_of_order_updates_keep_the_newest() {
        let mut collection = EventCollection::new();
        let fetch = collection.issue_fetch();
        collection.apply_fetch(fetch, vec![event(1, "original"), event(2, "other")]);

        let first = collection.issue_mutation();
        let second = collection.issue_mutation();

        assert_eq!(collection.apply_replaced(second, event(1, "second")), MutationOutcome::Applied);
        assert_eq!(collection.apply_replaced(first, event(1, "first")), MutationOutcome::Stale);
        assert_eq!(titles(&collection), vec!["second", "other"]);
    }

    #[test]
    fn mutation_issued_before_fetch_loses_to_it() {
        let mut collection = EventCollection::new();
        let mutation = collection.issue_mutation();
        let fetch = collection.issue_fetch();
        collection.apply_fetch(fetch, vec![event(1, "fetched")]);

        let start = "2024-02-01T00:00:00Z".parse().unwrap();
        assert_eq!(
            collection.apply_rescheduled(mutation, &RowId::from(1), start, start, true),
            MutationOutcome::Stale
        );
        assert!(!collection.get(&RowId::from(1)).unwrap().all_day);
    }

    #[test]
    fn created_row_already_fetched_is_not_duplicated() {
        let mut collection = EventCollection::new();
        let create = collection.issue_mutation();
        let fetch = collection.issue_fetch();
        collection.apply_fetch(fetch, vec![event(9, "from fetch")]);

        assert_eq!(collection.apply_created(create, event(9, "from insert")), MutationOutcome::Stale);
        assert_eq!(titles(&collection), vec!["from fetch"]);
    }

    #[test]
    fn late_fetch_keeps_newer_confirmed_records() {
        let mut collection = EventCollection::new();
        let first = collection.issue_fetch();
        collection.apply_fetch(first, vec![event(1, "original"), event(2, "other")]);

        let fetch = collection.issue_fetch();
        let edit = collection.issue_mutation();
        let create = collection.issue_mutation();
        collection.apply_replaced(edit, event(1, "edited"));
        collection.apply_created(create, event(3, "created"));

        assert_eq!(
            collection.apply_fetch(fetch, vec![event(1, "original"), event(2, "other")]),
            FetchOutcome::Replaced { count: 3 }
        );
        assert_eq!(titles(&collection), vec!["edited", "other", "created"]);
    }

    #[test]
    fn late_fetch_does_not_resurrect_deleted_record() {
        let mut collection = EventCollection::new();
        let first = collection.issue_fetch();
        collection.apply_fetch(first, vec![event(1, "doomed"), event(2, "kept")]);

        let fetch = collection.issue_fetch();
        let delete = collection.issue_mutation();
        assert_eq!(collection.apply_removed(delete, &RowId::from(1)), MutationOutcome::Applied);

        collection.apply_fetch(fetch, vec![event(1, "doomed"), event(2, "kept")]);
        assert_eq!(titles(&collection), vec!["kept"]);

        // выборка, выданная после удаления, видит таблицу как есть
        let next = collection.issue_fetch();
        collection.apply_fetch(next, vec![event(1, "restored elsewhere"), event(2, "kept")]);
        assert_eq!(titles(&collection), vec!["restored elsewhere", "kept"]);
    }

    #[test]
    fn missing_records_are_reported() {
        let mut collection = EventCollection::new();
        let stamp = collection.issue_mutation();
        assert_eq!(collection.apply_replaced(stamp, event(1, "x")), MutationOutcome::Missing);
        let delete = collection.issue_mutation();
        assert_eq!(collection.apply_removed(delete, &RowId::from(1)), MutationOutcome::Missing);
        assert!(collection.is_empty());
    }
}
