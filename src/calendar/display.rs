use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calendar::color::category_color;
use crate::models::{EventRow, RowId};

/// Поля, которые календарь не рисует, но возвращает в форму.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExtendedProps {
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
}

/// Событие в форме, которую потребляет сетка календаря.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEvent {
    pub id: RowId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub extended_props: ExtendedProps,
    /// Отметка последней записи, которая дошла до этого события.
    #[serde(skip)]
    pub(crate) version: u64,
}

impl DisplayEvent {
    pub fn from_row(row: EventRow) -> Self {
        let color = category_color(row.category.as_deref());
        Self {
            id: row.id,
            title: row.title,
            start: row.start_time,
            end: row.end_time,
            all_day: row.all_day,
            background_color: color,
            border_color: color,
            extended_props: ExtendedProps {
                description: row.description,
                location: row.location,
                category: row.category,
            },
            version: 0,
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.extended_props.category.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn recolor(&mut self) {
        let color = category_color(self.category());
        self.background_color = color;
        self.border_color = color;
    }
}
