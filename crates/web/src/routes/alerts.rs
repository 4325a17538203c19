//! Pastoral alerts panel, unread feed and follow-ups.

use axum::extract::{Path, Query, State};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use database::follow_up::{list_follow_ups, schedule_follow_up, scheduled_at};
use database::{alert, Alert, AlertFollowUp, Page, PageRequest};
use serde::{Deserialize, Serialize};

use crate::alert_feed::{unread_events, unread_snapshot, UnreadSnapshot};
use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AlertListQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub unread_only: bool,
}

fn default_page_size() -> i64 {
    database::pagination::DEFAULT_PAGE_SIZE
}

/// Paged alerts of the caller, newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<Page<Alert>>> {
    user.require_leadership()?;
    let request = PageRequest::new(query.page, query.page_size);
    let page = alert::list_alerts(state.db.pool(), &user.user_id, query.unread_only, request).await?;
    Ok(Json(page))
}

/// Current unread count and newest unread alerts.
pub async fn unread(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UnreadSnapshot>> {
    let snapshot = unread_snapshot(&state.db, &user.user_id).await?;
    Ok(Json(snapshot))
}

/// Server-sent `unread` events, one now and one after each change.
pub async fn stream(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    tracing::debug!(
        user_id = %user.user_id,
        subscribers = state.db.changes().subscriber_count(),
        "Alert stream opened"
    );
    Sse::new(unread_events(state.db.clone(), user.user_id)).keep_alive(KeepAlive::default())
}

/// Mark one of the caller's alerts as read.
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Alert>> {
    let alert = alert::mark_read(state.db.pool(), state.db.changes(), &id, &user.user_id).await?;
    Ok(Json(alert))
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Mark every unread alert of the caller as read.
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MarkAllReadResponse>> {
    let updated = alert::mark_all_read(state.db.pool(), state.db.changes(), &user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[derive(Deserialize)]
pub struct FollowUpRequest {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    #[serde(default)]
    pub notes: String,
}

/// Schedule a follow-up on one of the caller's alerts.
pub async fn create_follow_up(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<FollowUpRequest>,
) -> Result<Json<AlertFollowUp>> {
    let when = scheduled_at(&req.date, &req.time)?;
    let follow_up =
        schedule_follow_up(state.db.pool(), &id, &user.user_id, when, &req.notes, state.now()).await?;
    Ok(Json(follow_up))
}

/// Follow-ups of one of the caller's alerts.
pub async fn follow_ups(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<AlertFollowUp>>> {
    alert::get_alert_for_user(state.db.pool(), &id, &user.user_id).await?;
    let rows = list_follow_ups(state.db.pool(), &id).await?;
    Ok(Json(rows))
}
