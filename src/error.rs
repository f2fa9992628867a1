//! Типы ошибок приложения.

use thiserror::Error;

use crate::models::RowId;

/// Ошибки загрузки конфигурации.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Ошибки удалённого хранилища.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("No row with id {id} in table {table}")]
    NotFound { table: String, id: RowId },

    #[error("Store is unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ошибки календаря.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid event: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid time value: {0:?}")]
    InvalidTime(String),

    #[error("Event has not been saved yet")]
    NotPersisted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

