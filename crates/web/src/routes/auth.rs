//! Sign-in, sign-out and the current user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use database::{auth, role, UserRole};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: String,
    pub user_id: String,
    pub must_change_password: bool,
}

/// Exchange credentials for a bearer token.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    let pool = state.db.pool();
    let identity = match auth::verify_credentials(pool, &req.email, &req.password).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::info!(email = %req.email.trim(), "Sign-in rejected");
            return Err(err.into());
        }
    };

    let session = auth::create_session(pool, &identity.id, state.now(), state.session_ttl).await?;
    tracing::info!(user_id = %identity.id, "Signed in");

    Ok(Json(SignInResponse {
        token: session.token,
        expires_at: session.expires_at,
        user_id: identity.id,
        must_change_password: identity.must_change_password,
    }))
}

/// Revoke the session used for this request.
pub async fn sign_out(State(state): State<AppState>, user: CurrentUser) -> Result<StatusCode> {
    auth::revoke_session(state.db.pool(), &user.token).await?;
    tracing::info!(user_id = %user.user_id, "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Replace the caller's password, which also clears a temporary one.
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    let pool = state.db.pool();
    let identity = auth::get_identity(pool, &user.user_id).await?;
    auth::verify_credentials(pool, &identity.email, &req.current_password).await?;
    auth::set_password(pool, &user.user_id, &req.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: CurrentUser,
    pub roles: Vec<UserRole>,
    pub must_change_password: bool,
}

/// The signed-in user with every role they hold.
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<MeResponse>> {
    let pool = state.db.pool();
    let mut roles = role::roles_for_user(pool, &user.user_id).await?;
    roles.sort_by_key(|r| std::cmp::Reverse(r.rank()));
    let identity = auth::get_identity(pool, &user.user_id).await?;

    Ok(Json(MeResponse {
        user,
        roles,
        must_change_password: identity.must_change_password,
    }))
}
