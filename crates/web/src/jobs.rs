//! Alert generation runs, on demand and on a timer.

use std::time::{Duration, Instant};

use database::alert_generator::generate_pastoral_alerts;
use database::GenerationReport;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::state::AppState;

/// Outcome of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub report: GenerationReport,
    pub elapsed: Duration,
}

/// Run every alert rule once and time it.
pub async fn run_alert_generation(state: &AppState) -> database::Result<GenerationRun> {
    let started = Instant::now();
    info!("Generating pastoral alerts");

    let report =
        generate_pastoral_alerts(state.db.pool(), state.db.changes(), &state.thresholds, state.now())
            .await?;
    let elapsed = started.elapsed();

    info!(
        total = report.total,
        elapsed_ms = elapsed.as_millis() as u64,
        "Pastoral alerts generated"
    );

    Ok(GenerationRun { report, elapsed })
}

/// Spawn the periodic task: alert generation plus expired-session cleanup.
///
/// The first run happens one full period after start.
pub fn start_alert_scheduler(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(period_secs = period.as_secs(), "Alert scheduler started");

        loop {
            ticker.tick().await;

            if let Err(e) = run_alert_generation(&state).await {
                error!(error = %e, "Scheduled alert generation failed");
            }

            match database::auth::purge_expired_sessions(state.db.pool(), state.now()).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Expired sessions removed"),
                Err(e) => error!(error = %e, "Session cleanup failed"),
            }
        }
    })
}
