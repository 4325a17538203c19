//! Plans, their steps and per-user progress.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::{plan, Plan, PlanProgress, PlanStep, ProgressStatus};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub description: Option<String>,
}

pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Plan>>> {
    Ok(Json(plan::list_plans(state.db.pool(), &user.church_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePlanRequest>,
) -> Result<Json<Plan>> {
    user.require_leadership()?;
    let created = plan::create_plan(
        state.db.pool(),
        &user.church_id,
        &req.title,
        req.description.as_deref(),
        &user.user_id,
    )
    .await?;
    Ok(Json(created))
}

async fn load_plan(state: &AppState, user: &CurrentUser, id: &str) -> Result<Plan> {
    let found = plan::get_plan(state.db.pool(), id).await?;
    user.require_church(&found.church_id)?;
    Ok(found)
}

#[derive(Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub steps: Vec<PlanStep>,
    pub progress: Option<PlanProgress>,
}

/// A plan with its steps and the caller's progress.
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PlanDetail>> {
    let found = load_plan(&state, &user, &id).await?;
    let steps = plan::list_steps(state.db.pool(), &id).await?;
    let progress = plan::get_progress(state.db.pool(), &user.user_id, &id).await?;
    Ok(Json(PlanDetail {
        plan: found,
        steps,
        progress,
    }))
}

#[derive(Deserialize)]
pub struct AddStepRequest {
    pub title: String,
    pub content: Option<String>,
}

/// Append a step at the end of the plan.
pub async fn add_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<AddStepRequest>,
) -> Result<Json<PlanStep>> {
    user.require_leadership()?;
    load_plan(&state, &user, &id).await?;
    let step = plan::add_step(state.db.pool(), &id, &req.title, req.content.as_deref()).await?;
    Ok(Json(step))
}

/// Remove a step; the rest are renumbered and cursors clamped.
pub async fn remove_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, step_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    user.require_leadership()?;
    load_plan(&state, &user, &id).await?;

    let steps = plan::list_steps(state.db.pool(), &id).await?;
    if !steps.iter().any(|s| s.id == step_id) {
        return Err(database::DatabaseError::NotFound {
            entity: "PlanStep",
            id: step_id,
        }
        .into());
    }

    plan::remove_step(state.db.pool(), &step_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ProgressView {
    pub plan_id: String,
    pub current_step: i64,
    pub steps_count: i64,
    pub status: ProgressStatus,
}

/// The caller's cursor on a plan; `nao_iniciado` when never started.
pub async fn progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ProgressView>> {
    load_plan(&state, &user, &id).await?;
    let steps_count = plan::steps_count(state.db.pool(), &id).await?;
    let view = match plan::get_progress(state.db.pool(), &user.user_id, &id).await? {
        Some(p) => ProgressView {
            plan_id: p.plan_id,
            current_step: p.current_step,
            steps_count,
            status: p.status,
        },
        None => ProgressView {
            plan_id: id,
            current_step: 0,
            steps_count,
            status: ProgressStatus::NaoIniciado,
        },
    };
    Ok(Json(view))
}

pub async fn start(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PlanProgress>> {
    load_plan(&state, &user, &id).await?;
    Ok(Json(plan::start_plan(state.db.pool(), &user.user_id, &id).await?))
}

pub async fn advance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PlanProgress>> {
    load_plan(&state, &user, &id).await?;
    Ok(Json(plan::advance(state.db.pool(), &user.user_id, &id).await?))
}

#[derive(Deserialize)]
pub struct SetStepRequest {
    pub step: i64,
}

pub async fn set_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetStepRequest>,
) -> Result<Json<PlanProgress>> {
    load_plan(&state, &user, &id).await?;
    Ok(Json(plan::set_step(state.db.pool(), &user.user_id, &id, req.step).await?))
}

#[derive(Deserialize)]
pub struct CloseRequest {
    pub status: ProgressStatus,
}

/// Archive or remove the caller's progress on a plan.
pub async fn close(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<PlanProgress>> {
    load_plan(&state, &user, &id).await?;
    let pool = state.db.pool();
    let progress = match req.status {
        ProgressStatus::Arquivado => plan::archive(pool, &user.user_id, &id).await?,
        ProgressStatus::Removido => plan::remove(pool, &user.user_id, &id).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "status must be arquivado or removido, got {}",
                other
            )))
        }
    };
    Ok(Json(progress))
}

/// Every plan the caller is following.
pub async fn my_plans(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<PlanProgress>>> {
    Ok(Json(plan::list_progress_for_user(state.db.pool(), &user.user_id).await?))
}
