use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::application::config::EngineConfig;

use super::challenge_lifecycle::ChallengeLifecycleJob;
use super::streak_reminders::StreakReminderJob;
use super::streak_sweep::StreakReconciliationJob;

/// Wires the daily sweeps to cron triggers. Each trigger reads the wall
/// clock exactly once and hands `now` to the sweep, which never looks at the
/// clock itself; correctness per calendar day comes from the sweeps'
/// idempotent predicates, not from the trigger times.
pub struct SweepScheduler {
    scheduler: JobScheduler,
}

impl SweepScheduler {
    pub async fn start(
        config: &EngineConfig,
        streak_sweep: Arc<StreakReconciliationJob>,
        reminders: Arc<StreakReminderJob>,
        lifecycle: Arc<ChallengeLifecycleJob>,
    ) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;

        scheduler
            .add(Job::new_async(
                config.streak_sweep_cron.as_str(),
                move |_id, _sched| {
                    let job = Arc::clone(&streak_sweep);
                    Box::pin(async move {
                        if let Err(e) = job.run(Utc::now()).await {
                            error!(error = %e, "Daily streak reconciliation failed");
                        }
                    })
                },
            )?)
            .await?;

        scheduler
            .add(Job::new_async(
                config.reminder_cron.as_str(),
                move |_id, _sched| {
                    let job = Arc::clone(&reminders);
                    Box::pin(async move {
                        if let Err(e) = job.run(Utc::now()).await {
                            error!(error = %e, "Streak reminder run failed");
                        }
                    })
                },
            )?)
            .await?;

        scheduler
            .add(Job::new_async(
                config.lifecycle_cron.as_str(),
                move |_id, _sched| {
                    let job = Arc::clone(&lifecycle);
                    Box::pin(async move {
                        let outcome = job.run(Utc::now()).await;
                        info!(
                            finalized = outcome.finalized,
                            ending_soon = outcome.ending_soon_notified,
                            leaderboards = outcome.leaderboards_refreshed,
                            "Challenge lifecycle run completed"
                        );
                    })
                },
            )?)
            .await?;

        scheduler.start().await?;
        info!(
            streak_sweep = %config.streak_sweep_cron,
            reminders = %config.reminder_cron,
            lifecycle = %config.lifecycle_cron,
            "✅ Sweep scheduler started"
        );

        Ok(Self { scheduler })
    }

    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await?;
        info!("Sweep scheduler stopped");
        Ok(())
    }
}
