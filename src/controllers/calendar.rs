use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::calendar::{DateSelection, EventDraft, EventMove, EventQuery, MoveGesture};
use crate::controllers::{failure, store_status, Failure};
use crate::error::CalendarError;
use crate::models::RowId;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar/events", get(list_events).post(create_event))
        .route(
            "/calendar/events/{id}",
            get(edit_form).put(update_event).delete(delete_event),
        )
        .route("/calendar/events/{id}/schedule", patch(reschedule_event))
        .route("/calendar/selection", post(selection_form))
}

fn calendar_failure(error: CalendarError) -> Failure {
    let status = match &error {
        CalendarError::Validation(_) | CalendarError::InvalidTime(_) => StatusCode::BAD_REQUEST,
        CalendarError::NotPersisted => StatusCode::CONFLICT,
        CalendarError::Store(e) => store_status(e),
    };
    failure(status, error)
}

// GET /api/calendar/events?search=&category=
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, Failure> {
    let mut query = EventQuery::new();
    if let Some(search) = params.search {
        query = query.with_search(search);
    }
    if let Some(category) = params.category {
        query = query.with_category(category);
    }

    let outcome = state.calendar.fetch(&query).await.map_err(calendar_failure)?;
    Ok(Json(json!({
        "success": true,
        "fetch": outcome,
        "events": state.calendar.events(),
    })))
}

// POST /api/calendar/selection
async fn selection_form(Json(selection): Json<DateSelection>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "draft": EventDraft::from_selection(&selection),
    }))
}

// GET /api/calendar/events/{id}
async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    let id = RowId::from(id);
    let draft = state
        .calendar
        .begin_edit(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("Event {} is not loaded", id)))?;
    Ok(Json(json!({ "success": true, "id": id, "draft": draft })))
}

// POST /api/calendar/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, Failure> {
    let outcome = state.calendar.submit(&draft).await.map_err(calendar_failure)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "outcome": outcome,
            "events": state.calendar.events(),
        })),
    ))
}

// PUT /api/calendar/events/{id}
async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, Failure> {
    let draft = draft.for_edit(RowId::from(id));
    let outcome = state.calendar.submit(&draft).await.map_err(calendar_failure)?;
    Ok(Json(json!({
        "success": true,
        "outcome": outcome,
        "events": state.calendar.events(),
    })))
}

// DELETE /api/calendar/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    let draft = EventDraft::default().for_edit(RowId::from(id));
    let outcome = state.calendar.delete(&draft).await.map_err(calendar_failure)?;
    Ok(Json(json!({
        "success": true,
        "outcome": outcome,
        "events": state.calendar.events(),
    })))
}

// PATCH /api/calendar/events/{id}/schedule
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub start: String,
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub gesture: MoveGesture,
}

async fn reschedule_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, Failure> {
    let change = EventMove {
        id: RowId::from(id),
        start: req.start,
        end: req.end,
        all_day: req.all_day,
        gesture: req.gesture,
    };
    let outcome = state.calendar.reschedule(&change).await.map_err(calendar_failure)?;
    Ok(Json(json!({
        "success": true,
        "outcome": outcome,
        "event": state.calendar.event(&change.id),
    })))
}
