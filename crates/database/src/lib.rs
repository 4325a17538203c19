//! SQLite persistence layer for Corpo Vivo Conecta.
//!
//! Async database operations for churches, members, house groups,
//! discipleship, pastoral alerts and plans, using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{church, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:corpo_vivo.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let church = church::create_church(db.pool(), "Igreja Corpo Vivo", Some("Recife")).await?;
//!     println!("created {}", church.id);
//!
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod alert_generator;
pub mod announcement;
pub mod auth;
pub mod changes;
pub mod church;
pub mod discipleship;
pub mod enums;
pub mod error;
pub mod follow_up;
pub mod house_group;
pub mod models;
pub mod pagination;
pub mod plan;
pub mod prayer;
pub mod profile;
pub mod resource;
pub mod role;
pub mod validation;

pub use alert_generator::{AlertThresholds, GenerationReport};
pub use changes::{AlertChange, ChangeFeed, ChangeKind};
pub use enums::{ActivityType, AlertPriority, AlertType, ProgressStatus, UserRole};
pub use error::{DatabaseError, Result};
pub use models::{
    Activity, Alert, AlertFollowUp, Announcement, Attendance, AuthIdentity, Church, Discipulado,
    Encontro, GroupMeeting, GroupMember, HouseGroup, Plan, PlanProgress, PlanStep, PrayerRequest,
    Profile, Resource, RoleAssignment, Session,
};
pub use pagination::{Page, PageRequest};
pub use profile::ProfileField;
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Connection pool plus the alert change feed fed by writes through it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl Database {
    /// Default pool size for database connections.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// let db = database::Database::connect("sqlite:data/corpo_vivo.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Connected to database");

        Ok(Self {
            pool,
            changes: ChangeFeed::new(),
        })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Alert change notifications.
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
