//! Prayer requests, announcements and the resource library.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::validation::parse_timestamp;
use database::{
    announcement, prayer, resource, Announcement, Page, PageRequest, PrayerRequest, Resource,
    UserRole,
};
use serde::Deserialize;

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    database::pagination::DEFAULT_PAGE_SIZE
}

pub async fn list_prayer_requests(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PrayerRequest>>> {
    let page = prayer::list_prayer_requests(
        state.db.pool(),
        &user.church_id,
        &user.user_id,
        user.role,
        PageRequest::new(query.page, query.page_size),
    )
    .await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct PrayerRequestForm {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_private: bool,
}

pub async fn create_prayer_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<PrayerRequestForm>,
) -> Result<Json<PrayerRequest>> {
    let created = prayer::create_prayer_request(
        state.db.pool(),
        &user.church_id,
        &user.user_id,
        &form.title,
        &form.body,
        form.is_private,
    )
    .await?;
    Ok(Json(created))
}

/// Only the author or a pastoral role may mark a request answered.
pub async fn mark_answered(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PrayerRequest>> {
    let request = prayer::get_prayer_request(state.db.pool(), &id).await?;
    user.require_church(&request.church_id)?;
    if request.author_id != user.user_id {
        user.require_pastoral()?;
    }
    Ok(Json(prayer::mark_answered(state.db.pool(), &id).await?))
}

/// Announcements addressed to the caller's role that have not expired.
pub async fn list_announcements(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Announcement>>> {
    let rows = announcement::list_current(state.db.pool(), &user.church_id, user.role, state.now()).await?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct AnnouncementForm {
    pub title: String,
    pub body: String,
    pub audience: Option<UserRole>,
    /// `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DDTHH:MM[:SS]`, UTC.
    pub expires_at: Option<String>,
}

pub async fn create_announcement(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<AnnouncementForm>,
) -> Result<Json<Announcement>> {
    user.require_any(&[UserRole::Admin, UserRole::Pastor, UserRole::Lider])?;
    let expires_at = form
        .expires_at
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_timestamp("expires_at", s))
        .transpose()?;

    let created = announcement::create_announcement(
        state.db.pool(),
        &user.church_id,
        &user.user_id,
        &form.title,
        &form.body,
        form.audience,
        expires_at,
    )
    .await?;
    Ok(Json(created))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let found = announcement::get_announcement(state.db.pool(), &id).await?;
    user.require_church(&found.church_id)?;
    if found.author_id != user.user_id {
        user.require_pastoral()?;
    }
    announcement::delete_announcement(state.db.pool(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ResourceQuery {
    pub category: Option<String>,
}

pub async fn list_resources(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Vec<Resource>>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    Ok(Json(resource::list_resources(state.db.pool(), &user.church_id, category).await?))
}

pub async fn resource_categories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<String>>> {
    Ok(Json(resource::list_categories(state.db.pool(), &user.church_id).await?))
}

#[derive(Deserialize)]
pub struct ResourceForm {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub category: Option<String>,
}

pub async fn create_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<ResourceForm>,
) -> Result<Json<Resource>> {
    user.require_leadership()?;
    let created = resource::create_resource(
        state.db.pool(),
        &user.church_id,
        &user.user_id,
        &form.title,
        form.description.as_deref(),
        &form.url,
        form.category.as_deref(),
    )
    .await?;
    Ok(Json(created))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_pastoral()?;
    let found = resource::get_resource(state.db.pool(), &id).await?;
    user.require_church(&found.church_id)?;
    resource::delete_resource(state.db.pool(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
