//! Member registry.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::profile::{self, ProfileFilter};
use database::{role, Profile, ProfileField, UserRole, ValidationError};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProfileQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Profiles of the caller's church. `role` must be an exact role value.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<Profile>>> {
    user.require_leadership()?;

    let role = query
        .role
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(str::parse::<UserRole>)
        .transpose()?;

    let filter = ProfileFilter {
        role,
        search: query.search,
        include_inactive: query.include_inactive && user.role.is_pastoral(),
    };
    let profiles = profile::list_profiles(state.db.pool(), &user.church_id, &filter).await?;
    Ok(Json(profiles))
}

async fn load_visible(state: &AppState, user: &CurrentUser, id: &str) -> Result<Profile> {
    let profile = profile::get_profile(state.db.pool(), id).await?;
    user.require_church(&profile.church_id)?;
    Ok(profile)
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    if id != user.user_id {
        user.require_leadership()?;
    }
    Ok(Json(load_visible(&state, &user, &id).await?))
}

#[derive(Deserialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    pub value: Option<String>,
}

/// Update one field. Members may edit themselves; pastors anyone.
pub async fn update_field(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateFieldRequest>,
) -> Result<Json<Profile>> {
    let field = ProfileField::parse(&req.field).ok_or_else(|| {
        AppError::from(ValidationError::UnknownValue {
            field: "field".to_string(),
            value: req.field.clone(),
        })
    })?;

    if field == ProfileField::Supervisor || id != user.user_id {
        user.require_pastoral()?;
    }
    load_visible(&state, &user, &id).await?;

    let updated = profile::update_profile_field(state.db.pool(), &id, field, req.value.as_deref()).await?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Replace a user's role: the displayed role and the assignment rows.
pub async fn set_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<StatusCode> {
    user.require_any(&[UserRole::Admin])?;
    let new_role: UserRole = req.role.parse()?;
    load_visible(&state, &user, &id).await?;

    let pool = state.db.pool();
    profile::set_role(pool, &id, new_role).await?;

    let current = role::roles_for_user(pool, &id).await?;
    for old in current.iter().filter(|r| **r != new_role) {
        role::revoke_role(pool, &id, *old).await?;
    }
    if !current.contains(&new_role) {
        role::assign_role(pool, &id, new_role).await?;
    }

    tracing::info!(user_id = %id, role = %new_role, changed_by = %user.user_id, "Role changed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Deactivate or reactivate a member. Profiles are never deleted.
pub async fn set_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> Result<StatusCode> {
    user.require_pastoral()?;
    if id == user.user_id && !req.active {
        return Err(AppError::BadRequest("cannot deactivate yourself".to_string()));
    }
    load_visible(&state, &user, &id).await?;
    profile::set_active(state.db.pool(), &id, req.active).await?;
    Ok(StatusCode::NO_CONTENT)
}
