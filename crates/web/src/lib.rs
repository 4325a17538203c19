//! HTTP service for Corpo Vivo Conecta.
//!
//! JSON API over the church database: sessions, role-based navigation,
//! member registry, house groups, discipleship, plans, prayer requests,
//! announcements, resources and pastoral alerts with a live unread feed.

pub mod alert_feed;
pub mod config;
pub mod error;
pub mod jobs;
pub mod navigation;
pub mod provisioning;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
pub use crate::state::AppState;

/// The full application with request tracing.
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
