//! Состояние формы события и жесты на сетке календаря.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::calendar::display::DisplayEvent;
use crate::calendar::normalize::{format_for_form, normalize_span};
use crate::error::CalendarError;
use crate::models::{EventPayload, RowId, SchedulePatch};

/// Создание нового события или правка сохранённого.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Create,
    Edit(RowId),
}

/// Диапазон, выделенный на пустой сетке.
#[derive(Debug, Clone, Deserialize)]
pub struct DateSelection {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Validate, Serialize, Deserialize)]
pub struct EventDraft {
    #[serde(skip)]
    pub mode: FormMode,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.trim().is_empty()).map(str::to_string)
}

impl EventDraft {
    /// Пустая форма для выделенного диапазона.
    pub fn from_selection(selection: &DateSelection) -> Self {
        Self {
            mode: FormMode::Create,
            start: selection.start.clone(),
            end: selection
                .end
                .clone()
                .filter(|end| !end.is_empty())
                .unwrap_or_else(|| selection.start.clone()),
            all_day: selection.all_day,
            ..Self::default()
        }
    }

    /// Форма, заполненная полями существующего события.
    pub fn from_event(event: &DisplayEvent) -> Self {
        Self {
            mode: FormMode::Edit(event.id.clone()),
            title: event.title.clone(),
            description: event.extended_props.description.clone(),
            location: event.extended_props.location.clone(),
            category: event.extended_props.category.clone(),
            start: format_for_form(event.start, event.all_day),
            end: format_for_form(event.end, event.all_day),
            all_day: event.all_day,
        }
    }

    pub fn for_edit(mut self, id: RowId) -> Self {
        self.mode = FormMode::Edit(id);
        self
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// Проверка заголовка и нормализация времени перед отправкой.
    pub fn to_payload(&self) -> Result<EventPayload, CalendarError> {
        self.validate()?;
        let span = normalize_span(&self.start, &self.end, self.all_day)?;

        Ok(EventPayload {
            title: self.title.clone(),
            description: non_blank(&self.description),
            location: non_blank(&self.location),
            category: non_blank(&self.category),
            start_time: span.start,
            end_time: span.end,
            all_day: self.all_day,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveGesture {
    Drop,
    Resize,
    #[default]
    Change,
}

/// Новое время события после перетаскивания, растягивания или
/// программного изменения.
#[derive(Debug, Clone, Deserialize)]
pub struct EventMove {
    pub id: RowId,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub gesture: MoveGesture,
}

impl EventMove {
    pub fn to_patch(&self) -> Result<SchedulePatch, CalendarError> {
        let span = normalize_span(&self.start, self.end.as_deref().unwrap_or(""), self.all_day)?;
        Ok(SchedulePatch {
            start_time: span.start,
            end_time: span.end,
            all_day: self.all_day,
        })
    }
}
