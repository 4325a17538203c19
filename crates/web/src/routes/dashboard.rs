//! Dashboard statistics.

use axum::extract::State;
use axum::Json;
use chrono::Duration;
use database::follow_up::list_due_for_user;
use database::{alert, house_group, plan, profile, AlertFollowUp, ProgressStatus, UserRole};
use serde::Serialize;

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

/// How far ahead the dashboard looks for scheduled follow-ups.
pub const UPCOMING_FOLLOW_UP_DAYS: i64 = 7;

/// Dashboard statistics for the caller's church.
#[derive(Clone, Serialize)]
pub struct Stats {
    pub member_count: i64,
    pub active_groups: i64,
    pub unread_alerts: i64,
    pub plans_in_progress: i64,
    /// Follow-ups the caller scheduled for the coming week.
    pub upcoming_follow_ups: Vec<AlertFollowUp>,
    /// Filled for pastoral roles only.
    pub roles: Vec<RoleStats>,
}

/// Active members holding one role.
#[derive(Clone, Serialize)]
pub struct RoleStats {
    pub role: UserRole,
    pub member_count: i64,
}

/// Get dashboard statistics as JSON.
pub async fn stats_api(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Stats>> {
    let stats = get_stats(&state, &user).await?;
    Ok(Json(stats))
}

/// Fetch statistics from the database.
async fn get_stats(state: &AppState, user: &CurrentUser) -> Result<Stats> {
    let pool = state.db.pool();

    let by_role = profile::count_by_role(pool, &user.church_id).await?;
    let member_count: i64 = by_role.iter().map(|(_, c)| *c).sum();
    let active_groups = house_group::weekly_schedule(pool, &user.church_id).await?.len() as i64;
    let unread_alerts = alert::unread_count(pool, &user.user_id).await?;
    let plans_in_progress = plan::list_progress_for_user(pool, &user.user_id)
        .await?
        .iter()
        .filter(|p| p.status == ProgressStatus::EmProgresso)
        .count() as i64;

    let now = state.now();
    let upcoming_follow_ups = list_due_for_user(
        pool,
        &user.user_id,
        now,
        now + Duration::days(UPCOMING_FOLLOW_UP_DAYS),
    )
    .await?;

    let roles = if user.role.is_pastoral() {
        by_role
            .into_iter()
            .map(|(role, member_count)| RoleStats { role, member_count })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Stats {
        member_count,
        active_groups,
        unread_alerts,
        plans_in_progress,
        upcoming_follow_ups,
        roles,
    })
}
