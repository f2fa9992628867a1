use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::models::RowId;

/// Категория события календаря.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shoot,
    Meeting,
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Shoot, Category::Meeting, Category::Other];

    /// Точное совпадение, как в хранилище. Всё остальное - `None`.
    pub fn parse(value: &str) -> Option<Category> {
        match value {
            "shoot" => Some(Category::Shoot),
            "meeting" => Some(Category::Meeting),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shoot => "shoot",
            Category::Meeting => "meeting",
            Category::Other => "other",
        }
    }

}

/// Строка таблицы `events` в том виде, в котором её отдаёт хранилище.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRow {
    pub id: RowId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl EventRow {
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        serde_json::from_value(value).map_err(|e| StoreError::InvalidRow(e.to_string()))
    }
}

/// Полное тело insert/update из формы события.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventPayload {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
}

/// Частичное обновление после перетаскивания или растягивания.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchedulePatch {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
}
