//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use database::AlertThresholds;

/// Longest session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
/// Longest alert generation period: one week.
pub const MAX_ALERTS_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
/// Largest meeting window for the absence rule.
pub const MAX_ABSENCE_MEETINGS: i64 = 52;
/// Largest look-back, in days, for the date-based alert rules.
pub const MAX_ALERT_DAYS: i64 = 3650;

/// Web service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Maximum pooled database connections.
    pub pool_size: u32,
    /// Lifetime of a sign-in session.
    pub session_ttl: chrono::Duration,
    /// Period of the background alert generation; `None` disables it.
    pub alerts_interval: Option<Duration>,
    /// Alert rule tunables.
    pub thresholds: AlertThresholds,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CORPO_VIVO_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:corpo_vivo.db?mode=rwc` |
    /// | `DATABASE_POOL_SIZE` | Pooled connections | `20` |
    /// | `SESSION_TTL_HOURS` | Session lifetime, at most 8760 | `72` |
    /// | `ALERTS_INTERVAL_SECS` | Alert generation period, `0` disables, at most 604800 | `0` |
    /// | `ALERT_ABSENCE_MEETINGS` | Missed meetings before an absence alert, at most 52 | `3` |
    /// | `ALERT_NEW_CONVERT_DAYS` | Days a convert counts as new, at most 3650 | `30` |
    /// | `ALERT_ENCONTRO_OVERDUE_DAYS` | Days without an encontro before an alert, at most 3650 | `14` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("CORPO_VIVO_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:corpo_vivo.db?mode=rwc".to_string());

        let pool_size = parse_var("DATABASE_POOL_SIZE", database::Database::DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::InvalidNumber("DATABASE_POOL_SIZE"));
        }

        let ttl_hours = parse_bounded("SESSION_TTL_HOURS", 72, MAX_SESSION_TTL_HOURS)?;

        let interval_secs: u64 = parse_var("ALERTS_INTERVAL_SECS", 0)?;
        if interval_secs > MAX_ALERTS_INTERVAL_SECS {
            return Err(ConfigError::TooLarge {
                name: "ALERTS_INTERVAL_SECS",
                max: MAX_ALERTS_INTERVAL_SECS as i64,
            });
        }
        let alerts_interval = (interval_secs > 0).then(|| Duration::from_secs(interval_secs));

        let defaults = AlertThresholds::default();
        let thresholds = AlertThresholds {
            absence_meetings: parse_bounded(
                "ALERT_ABSENCE_MEETINGS",
                defaults.absence_meetings,
                MAX_ABSENCE_MEETINGS,
            )?,
            new_convert_days: parse_bounded(
                "ALERT_NEW_CONVERT_DAYS",
                defaults.new_convert_days,
                MAX_ALERT_DAYS,
            )?,
            encontro_overdue_days: parse_bounded(
                "ALERT_ENCONTRO_OVERDUE_DAYS",
                defaults.encontro_overdue_days,
                MAX_ALERT_DAYS,
            )?,
        };

        Ok(Self {
            addr,
            database_url,
            pool_size,
            session_ttl: chrono::Duration::hours(ttl_hours),
            alerts_interval,
            thresholds,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8790)),
            database_url: "sqlite:corpo_vivo.db?mode=rwc".to_string(),
            pool_size: database::Database::DEFAULT_POOL_SIZE,
            session_ttl: chrono::Duration::hours(72),
            alerts_interval: None,
            thresholds: AlertThresholds::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidNumber(name))
        }
        _ => Ok(default),
    }
}

fn parse_bounded(name: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    check_bounds(name, parse_var(name, default)?, max)
}

/// Accept `value` only within `1..=max`.
fn check_bounds(name: &'static str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::InvalidNumber(name));
    }
    if value > max {
        return Err(ConfigError::TooLarge { name, max });
    }
    Ok(value)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid CORPO_VIVO_ADDR format")]
    InvalidAddr,

    #[error("{0} must be a positive number")]
    InvalidNumber(&'static str),

    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: i64 },
}
