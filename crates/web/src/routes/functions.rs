//! The two function endpoints: alert generation and user provisioning.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::AlertType;
use serde::Serialize;
use serde_json::json;

use crate::jobs::run_alert_generation;
use crate::provisioning::{provision_user, CreateUserRequest};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAlertsResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub execution_time_ms: u64,
    pub metrics: BTreeMap<AlertType, i64>,
    pub total_alerts: i64,
}

fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// `POST /functions/generate-pastoral-alerts`. Requires an admin or pastor session.
pub async fn generate_pastoral_alerts(State(state): State<AppState>, caller: CurrentUser) -> Response {
    if let Err(err) = caller.require_pastoral() {
        return err.into_response();
    }
    tracing::info!(requested_by = %caller.user_id, "Alert generation requested");

    match run_alert_generation(&state).await {
        Ok(run) => {
            let body = GenerateAlertsResponse {
                success: true,
                message: format!("{} pastoral alerts generated", run.report.total),
                timestamp: rfc3339_now(),
                execution_time_ms: run.elapsed.as_millis() as u64,
                metrics: run.report.counts,
                total_alerts: run.report.total,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "Alert generation failed");
            let body = json!({
                "error": err.to_string(),
                "timestamp": rfc3339_now(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user_id: String,
    pub message: String,
    pub temporary_password: String,
}

/// `POST /functions/create-user`. Requires an admin or pastor session.
pub async fn create_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Response {
    if let Err(err) = caller.require_pastoral() {
        return err.into_response();
    }
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let body = json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match provision_user(&state, &caller, &req).await {
        Ok(user) => {
            let body = CreateUserResponse {
                success: true,
                message: format!("User {} created", req.email.trim()),
                user_id: user.user_id,
                temporary_password: user.temporary_password,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            tracing::info!(error = %err, email = %req.email.trim(), "User provisioning failed");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}
