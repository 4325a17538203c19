//! Signed-in user context, resolved per request from a bearer token.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use database::{profile, role, DatabaseError, UserRole};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// The user behind the current request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub church_id: String,
    pub role: UserRole,
    pub full_name: String,
    #[serde(skip)]
    pub token: String,
}

impl CurrentUser {
    /// Fail with `Forbidden` unless the user holds one of `roles`.
    pub fn require_any(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, role = %self.role, ?roles, "Role check failed");
            Err(AppError::Forbidden)
        }
    }

    pub fn require_pastoral(&self) -> Result<(), AppError> {
        self.require_any(&[UserRole::Admin, UserRole::Pastor])
    }

    pub fn require_leadership(&self) -> Result<(), AppError> {
        self.require_any(&[
            UserRole::Admin,
            UserRole::Pastor,
            UserRole::Missionario,
            UserRole::Lider,
        ])
    }

    /// Fail with `Forbidden` when `church_id` belongs to another church.
    pub fn require_church(&self, church_id: &str) -> Result<(), AppError> {
        if self.church_id == church_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let pool = state.db.pool();

        let session = database::auth::resolve_session(pool, token, state.now())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let profile = match profile::get_profile(pool, &session.user_id).await {
            Ok(profile) => profile,
            Err(DatabaseError::NotFound { .. }) => {
                tracing::warn!(user_id = %session.user_id, "Session for identity without profile");
                return Err(AppError::Unauthorized);
            }
            Err(err) => return Err(err.into()),
        };

        if !profile.active {
            return Err(AppError::Unauthorized);
        }

        let role = role::primary_role(pool, &profile.id)
            .await?
            .unwrap_or(profile.role);

        Ok(CurrentUser {
            user_id: profile.id,
            church_id: profile.church_id,
            role,
            full_name: profile.full_name,
            token: session.token,
        })
    }
}
