//! Route handlers for the web service.

pub mod admin;
pub mod alerts;
pub mod auth;
pub mod community;
pub mod dashboard;
pub mod discipleship;
pub mod functions;
pub mod groups;
pub mod health;
pub mod navigation;
pub mod plans;
pub mod profiles;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Sessions
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/password", post(auth::change_password))
        .route("/api/me", get(auth::me))
        .route("/api/me/plans", get(plans::my_plans))
        .route("/api/navigation", get(navigation::navigation))
        .route("/api/dashboard", get(dashboard::stats_api))
        // Function endpoints
        .route(
            "/functions/generate-pastoral-alerts",
            post(functions::generate_pastoral_alerts),
        )
        .route("/functions/create-user", post(functions::create_user))
        // Alerts
        .route("/api/alerts", get(alerts::list_alerts))
        .route("/api/alerts/unread", get(alerts::unread))
        .route("/api/alerts/stream", get(alerts::stream))
        .route("/api/alerts/read-all", post(alerts::mark_all_read))
        .route("/api/alerts/:id/read", post(alerts::mark_read))
        .route(
            "/api/alerts/:id/follow-ups",
            get(alerts::follow_ups).post(alerts::create_follow_up),
        )
        // Members
        .route("/api/profiles", get(profiles::list))
        .route(
            "/api/profiles/:id",
            get(profiles::get).patch(profiles::update_field),
        )
        .route("/api/profiles/:id/role", put(profiles::set_role))
        .route("/api/profiles/:id/active", put(profiles::set_active))
        // Plans
        .route("/api/plans", get(plans::list).post(plans::create))
        .route("/api/plans/:id", get(plans::get))
        .route("/api/plans/:id/steps", post(plans::add_step))
        .route("/api/plans/:id/steps/:step_id", delete(plans::remove_step))
        .route(
            "/api/plans/:id/progress",
            get(plans::progress).put(plans::set_step),
        )
        .route("/api/plans/:id/progress/start", post(plans::start))
        .route("/api/plans/:id/progress/advance", post(plans::advance))
        .route("/api/plans/:id/progress/close", post(plans::close))
        // House groups
        .route("/api/groups", get(groups::list).post(groups::create))
        .route("/api/groups/schedule", get(groups::schedule))
        .route("/api/groups/:id", get(groups::get).put(groups::update))
        .route("/api/groups/:id/active", put(groups::set_active))
        .route(
            "/api/groups/:id/members",
            get(groups::members).post(groups::add_member),
        )
        .route(
            "/api/groups/:id/members/:profile_id",
            delete(groups::remove_member),
        )
        .route(
            "/api/groups/:id/meetings",
            get(groups::meetings).post(groups::record_meeting),
        )
        .route("/api/meetings/:id/attendance", get(groups::attendance))
        // Discipleship
        .route(
            "/api/discipulados",
            get(discipleship::list).post(discipleship::start),
        )
        .route("/api/discipulados/:id/end", post(discipleship::end))
        .route(
            "/api/discipulados/:id/encontros",
            get(discipleship::encontros).post(discipleship::log_encontro),
        )
        .route(
            "/api/discipulados/:id/activities",
            get(discipleship::activities).post(discipleship::add_activity),
        )
        .route(
            "/api/activities/:id/completed",
            put(discipleship::set_activity_completed),
        )
        // Community
        .route(
            "/api/prayer-requests",
            get(community::list_prayer_requests).post(community::create_prayer_request),
        )
        .route(
            "/api/prayer-requests/:id/answered",
            post(community::mark_answered),
        )
        .route(
            "/api/announcements",
            get(community::list_announcements).post(community::create_announcement),
        )
        .route("/api/announcements/:id", delete(community::delete_announcement))
        .route(
            "/api/resources",
            get(community::list_resources).post(community::create_resource),
        )
        .route("/api/resources/categories", get(community::resource_categories))
        .route("/api/resources/:id", delete(community::delete_resource))
        // Provisioning cleanup
        .route(
            "/api/admin/orphaned-identities",
            get(admin::orphaned_identities),
        )
        .route(
            "/api/admin/orphaned-identities/:id",
            delete(admin::delete_orphaned_identity),
        )
}
