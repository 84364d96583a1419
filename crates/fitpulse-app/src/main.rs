use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use fitpulse::application::services::{
    ChallengeLifecycleJob, StreakReconciliationJob, StreakReminderJob, SweepScheduler,
};
use fitpulse::application::EngineConfig;
use fitpulse_infrastructure::logging;
use fitpulse_infrastructure::persistence::repositories::{
    SqliteChallengeRepository, SqliteNotificationStore, SqliteParticipantRepository,
    SqliteStreakRepository,
};
use fitpulse_infrastructure::persistence::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env();
    logging::init_logger(config.log_dir())?;

    let startup_started_at = Instant::now();
    info!("Starting FitPulse engine");

    let db_path = config.db_path();
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid database path"))?;
    info!("Database path: {}", db_path_str);

    let started_at = Instant::now();
    let database = Database::new(db_path_str).await?;
    database.run_migrations().await?;
    info!("✓ Database ready ({}ms)", started_at.elapsed().as_millis());

    let pool = Arc::new(database.pool().clone());
    let streaks = Arc::new(SqliteStreakRepository::new(pool.clone()));
    let challenges = Arc::new(SqliteChallengeRepository::new(pool.clone()));
    let participants = Arc::new(SqliteParticipantRepository::new(pool.clone()));
    let notifications = Arc::new(SqliteNotificationStore::new(pool));

    // The event-driven services (activity ingestion, streak engine, progress
    // ledger, queries) are library surface for the request-path collaborators;
    // the daemon itself drives only the scheduled sweeps.
    let streak_sweep = Arc::new(StreakReconciliationJob::new(streaks.clone()));
    let reminders = Arc::new(StreakReminderJob::new(streaks, notifications.clone()));
    let lifecycle = Arc::new(ChallengeLifecycleJob::new(
        challenges,
        participants,
        notifications,
    ));

    let scheduler = SweepScheduler::start(&config, streak_sweep, reminders, lifecycle).await?;

    info!(
        "✅ FitPulse engine ready ({}ms)",
        startup_started_at.elapsed().as_millis()
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    scheduler.shutdown().await?;

    Ok(())
}
