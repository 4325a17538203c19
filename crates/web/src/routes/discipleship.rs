//! Discipleship pairings, encontros and activities.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::discipleship as d;
use database::{profile, Activity, ActivityType, DatabaseError, Discipulado, Encontro};
use serde::Deserialize;

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    /// Pastoral roles may look at another leader's pairings.
    pub leader_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Discipulado>>> {
    user.require_leadership()?;
    let leader_id = match query.leader_id {
        Some(other) if other != user.user_id => {
            user.require_pastoral()?;
            other
        }
        _ => user.user_id.clone(),
    };

    let rows = d::list_for_leader(state.db.pool(), &leader_id).await?;
    Ok(Json(rows.into_iter().filter(|r| r.church_id == user.church_id).collect()))
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub disciple_id: String,
    /// Defaults to the caller.
    pub leader_id: Option<String>,
    pub notes: Option<String>,
}

pub async fn start(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<StartRequest>,
) -> Result<Json<Discipulado>> {
    user.require_leadership()?;
    let leader_id = req.leader_id.unwrap_or_else(|| user.user_id.clone());
    if leader_id != user.user_id {
        user.require_pastoral()?;
    }

    let pool = state.db.pool();
    for id in [&leader_id, &req.disciple_id] {
        let found = profile::get_profile(pool, id).await?;
        user.require_church(&found.church_id)?;
    }

    if let Some(existing) = d::active_for_disciple(pool, &req.disciple_id).await? {
        return Err(DatabaseError::Conflict(format!(
            "disciple already has active discipulado {} with leader {}",
            existing.id, existing.leader_id
        ))
        .into());
    }

    let started =
        d::start_discipulado(pool, &user.church_id, &leader_id, &req.disciple_id, req.notes.as_deref())
            .await?;
    Ok(Json(started))
}

/// Load a pairing the caller leads, or any pairing of the church for pastors.
async fn load_pairing(state: &AppState, user: &CurrentUser, id: &str) -> Result<Discipulado> {
    let pairing = d::get_discipulado(state.db.pool(), id).await?;
    user.require_church(&pairing.church_id)?;
    if pairing.leader_id != user.user_id {
        user.require_pastoral()?;
    }
    Ok(pairing)
}

pub async fn end(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    load_pairing(&state, &user, &id).await?;
    d::end_discipulado(state.db.pool(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn encontros(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Encontro>>> {
    load_pairing(&state, &user, &id).await?;
    Ok(Json(d::list_encontros(state.db.pool(), &id).await?))
}

#[derive(Deserialize)]
pub struct EncontroRequest {
    pub met_on: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

pub async fn log_encontro(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<EncontroRequest>,
) -> Result<Json<Encontro>> {
    load_pairing(&state, &user, &id).await?;
    let encontro = d::log_encontro(
        state.db.pool(),
        &id,
        &req.met_on,
        req.topic.as_deref(),
        req.notes.as_deref(),
    )
    .await?;
    Ok(Json(encontro))
}

pub async fn activities(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Activity>>> {
    load_pairing(&state, &user, &id).await?;
    Ok(Json(d::list_activities(state.db.pool(), &id).await?))
}

#[derive(Deserialize)]
pub struct ActivityRequest {
    pub activity_type: ActivityType,
    pub description: String,
    pub due_date: Option<String>,
}

pub async fn add_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<Activity>> {
    load_pairing(&state, &user, &id).await?;
    let activity = d::add_activity(
        state.db.pool(),
        &id,
        req.activity_type,
        &req.description,
        req.due_date.as_deref(),
    )
    .await?;
    Ok(Json(activity))
}

#[derive(Deserialize)]
pub struct CompletedRequest {
    pub completed: bool,
}

/// Mark an activity done. The disciple may tick off their own activities.
pub async fn set_activity_completed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(activity_id): Path<String>,
    Json(req): Json<CompletedRequest>,
) -> Result<Json<Activity>> {
    let activity = d::get_activity(state.db.pool(), &activity_id).await?;
    let pairing = d::get_discipulado(state.db.pool(), &activity.discipulado_id).await?;
    if pairing.disciple_id != user.user_id {
        load_pairing(&state, &user, &pairing.id).await?;
    }
    Ok(Json(d::set_activity_completed(state.db.pool(), &activity_id, req.completed).await?))
}
