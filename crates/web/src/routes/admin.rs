//! Cleanup of identities left behind by failed provisioning.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::auth;
use serde::Serialize;

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Serialize)]
pub struct OrphanedIdentity {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

/// Identities the caller's church provisioned that have no profile.
pub async fn orphaned_identities(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<OrphanedIdentity>>> {
    user.require_any(&[database::UserRole::Admin])?;
    let rows = auth::list_orphaned_identities(state.db.pool(), &user.church_id).await?;
    Ok(Json(
        rows.into_iter()
            .map(|i| OrphanedIdentity {
                id: i.id,
                email: i.email,
                created_at: i.created_at,
            })
            .collect(),
    ))
}

/// Delete an identity that has no profile, freeing its email.
pub async fn delete_orphaned_identity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_any(&[database::UserRole::Admin])?;
    auth::delete_orphaned_identity(state.db.pool(), &user.church_id, &id).await?;
    tracing::info!(identity_id = %id, deleted_by = %user.user_id, "Orphaned identity deleted");
    Ok(StatusCode::NO_CONTENT)
}
