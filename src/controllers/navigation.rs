use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::shell::{nav_items, resolve, section_title, NavState, Role, Route};
use crate::AppState;

const DEFAULT_WIDTH: u32 = 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/navigation", get(navigation))
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub path: Option<String>,
    pub width: Option<u32>,
    pub role: Option<String>,
    pub user_id: Option<String>,
}

// GET /api/navigation?path=&width=&role=&user_id=
async fn navigation(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NavigationQuery>,
) -> impl IntoResponse {
    let path = params.path.unwrap_or_else(|| "/home/".to_string());
    let role = Role::parse(params.role.as_deref().unwrap_or_default());
    let nav = NavState::new(params.width.unwrap_or(DEFAULT_WIDTH));

    // без счётчика навигация всё равно нужна
    let unread = match params.user_id.as_deref() {
        Some(user_id) => state.tasks.count(user_id).await.unwrap_or(0),
        None => 0,
    };

    let route = match resolve(&path) {
        Route::Section(section) => json!({ "section": section }),
        Route::AttendanceReport(id) => json!({ "attendance_report": id }),
        Route::Redirect(section) => json!({ "redirect": section.path() }),
        Route::NotFound => json!({ "not_found": true }),
    };

    Json(json!({
        "success": true,
        "layout": nav.layout,
        "collapsed": nav.collapsed,
        "sidebar_width": nav.sidebar_width(),
        "title": section_title(&path),
        "route": route,
        "items": nav_items(role, &path, unread),
    }))
}
