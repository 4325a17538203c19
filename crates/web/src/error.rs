//! Error types for the web service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database error.
    #[error("{0}")]
    Database(#[from] DatabaseError),

    /// Input the handler itself rejected.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, unknown or expired session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Signed in, but the role does not allow this.
    #[error("Forbidden")]
    Forbidden,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<database::ValidationError> for AppError {
    fn from(err: database::ValidationError) -> Self {
        AppError::Database(DatabaseError::Invalid(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(err) => match err {
                DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseError::AlreadyExists { .. } | DatabaseError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                DatabaseError::Invalid(_) => StatusCode::BAD_REQUEST,
                DatabaseError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use database::ValidationError;

    #[test]
    fn test_status_mapping() {
        let not_found = AppError::from(DatabaseError::NotFound {
            entity: "Profile",
            id: "x".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let dup = AppError::from(DatabaseError::AlreadyExists {
            entity: "AuthIdentity",
            id: "a@b.com".to_string(),
        });
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let invalid = AppError::from(ValidationError::InPast("scheduled_for".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::from(DatabaseError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
