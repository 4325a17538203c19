//! Application state shared across handlers.

use chrono::NaiveDateTime;
use database::{AlertThresholds, Database};

use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection and alert change feed.
    pub db: Database,
    /// Lifetime of newly created sessions.
    pub session_ttl: chrono::Duration,
    /// Alert rule tunables.
    pub thresholds: AlertThresholds,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            session_ttl: config.session_ttl,
            thresholds: config.thresholds,
        }
    }

    /// Current UTC wall-clock time, as stored in the database.
    pub fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}
