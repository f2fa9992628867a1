use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::controllers::{failure, store_status, Failure};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/unread", get(unread_count))
}

#[derive(Debug, Deserialize)]
pub struct UnreadQuery {
    pub user_id: String,
}

// GET /api/tasks/unread?user_id=
async fn unread_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UnreadQuery>,
) -> Result<impl IntoResponse, Failure> {
    let unread = state
        .tasks
        .count(&params.user_id)
        .await
        .map_err(|e| failure(store_status(&e), e))?;

    Ok(Json(json!({
        "success": true,
        "user_id": params.user_id,
        "unread": unread,
    })))
}
