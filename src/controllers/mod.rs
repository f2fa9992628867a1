pub mod calendar;
pub mod navigation;
pub mod tasks;

use axum::{http::StatusCode, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::StoreError;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(calendar::routes())
        .merge(tasks::routes())
        .merge(navigation::routes())
}

pub(crate) type Failure = (StatusCode, Json<Value>);

pub(crate) fn failure(status: StatusCode, error: impl ToString) -> Failure {
    (
        status,
        Json(json!({
            "success": false,
            "error": error.to_string(),
        })),
    )
}

pub(crate) fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}
