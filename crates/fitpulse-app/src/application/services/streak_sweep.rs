use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use fitpulse_domain::calendar;
use fitpulse_domain::shared::DomainError;
use fitpulse_domain::streak::StreakRepository;

/// Tally of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub frozen: u32,
    pub broken: u32,
    pub skipped: u32,
}

/// Daily reconciliation: catches users who logged nothing for a full day,
/// since the transition table only runs on activity events. Takes `now`
/// explicitly so tests can replay arbitrary days.
pub struct StreakReconciliationJob {
    streaks: Arc<dyn StreakRepository>,
}

impl StreakReconciliationJob {
    pub fn new(streaks: Arc<dyn StreakRepository>) -> Self {
        Self { streaks }
    }

    /// Process every streak whose last activity is strictly before
    /// yesterday: spend a freeze and enter the frozen hold, or break the
    /// streak. Idempotent per day — frozen records leave the sweep's filter
    /// via `is_frozen`, broken ones via `current_streak > 0` — so a rerun
    /// (or a restart mid-sweep) finds only the unprocessed remainder.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepOutcome, DomainError> {
        let cutoff = calendar::yesterday(calendar::day_of(now));
        let stale = self.streaks.find_stale(cutoff).await?;

        info!(candidates = stale.len(), %cutoff, "Running daily streak reconciliation");

        let mut outcome = SweepOutcome::default();
        for expected in stale {
            let mut streak = expected.clone();
            let froze = streak.freeze_missed_day();
            if !froze {
                streak.break_streak();
            }

            match self.streaks.update_if_unchanged(&streak, &expected).await {
                Ok(true) => {
                    if froze {
                        outcome.frozen += 1;
                        info!(
                            user_id = %streak.user_id(),
                            freezes_left = streak.freezes_available(),
                            "Streak held by freeze"
                        );
                    } else {
                        outcome.broken += 1;
                        info!(user_id = %streak.user_id(), "Streak broken");
                    }
                }
                Ok(false) => {
                    // The user logged activity while the sweep ran; their
                    // event already resolved the day.
                    outcome.skipped += 1;
                    warn!(user_id = %streak.user_id(), "Sweep lost a race, record skipped");
                }
                Err(e) => {
                    outcome.skipped += 1;
                    error!(
                        user_id = %streak.user_id(),
                        error = %e,
                        "Failed to reconcile streak, continuing"
                    );
                }
            }
        }

        info!(
            frozen = outcome.frozen,
            broken = outcome.broken,
            skipped = outcome.skipped,
            "Daily streak reconciliation completed"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use fitpulse_domain::shared::UserId;
    use fitpulse_domain::streak::Streak;
    use fitpulse_infrastructure::memory::InMemoryStreakRepository;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sweep_time(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 0, 5, 0).unwrap()
    }

    #[tokio::test]
    async fn test_missed_day_with_freeze_enters_frozen_hold() {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let user = UserId::new();
        repo.insert(&Streak::restore(
            user.clone(),
            5,
            5,
            date(2025, 3, 11),
            date(2025, 3, 7),
            false,
            1,
        ))
        .await
        .unwrap();

        let job = StreakReconciliationJob::new(repo.clone());
        let outcome = job.run(sweep_time(13)).await.unwrap();
        assert_eq!(outcome, SweepOutcome { frozen: 1, broken: 0, skipped: 0 });

        let stored = repo.find_by_user(&user).await.unwrap().unwrap();
        assert!(stored.is_frozen());
        assert_eq!(stored.current_streak(), 5);
        assert_eq!(stored.freezes_available(), 0);
    }

    #[tokio::test]
    async fn test_missed_day_without_freeze_breaks() {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let user = UserId::new();
        repo.insert(&Streak::restore(
            user.clone(),
            5,
            9,
            date(2025, 3, 11),
            date(2025, 3, 7),
            false,
            0,
        ))
        .await
        .unwrap();

        let job = StreakReconciliationJob::new(repo.clone());
        let outcome = job.run(sweep_time(13)).await.unwrap();
        assert_eq!(outcome, SweepOutcome { frozen: 0, broken: 1, skipped: 0 });

        let stored = repo.find_by_user(&user).await.unwrap().unwrap();
        assert_eq!(stored.current_streak(), 0);
        assert_eq!(stored.longest_streak(), 9);
    }

    #[tokio::test]
    async fn test_user_active_yesterday_is_untouched() {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let user = UserId::new();
        let streak = Streak::restore(
            user.clone(),
            5,
            5,
            date(2025, 3, 12),
            date(2025, 3, 8),
            false,
            1,
        );
        repo.insert(&streak).await.unwrap();

        let job = StreakReconciliationJob::new(repo.clone());
        let outcome = job.run(sweep_time(13)).await.unwrap();
        assert_eq!(outcome, SweepOutcome::default());

        assert_eq!(repo.find_by_user(&user).await.unwrap().unwrap(), streak);
    }

    #[tokio::test]
    async fn test_rerun_same_day_consumes_nothing_more() {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let with_freeze = UserId::new();
        let without = UserId::new();
        repo.insert(&Streak::restore(
            with_freeze.clone(),
            5,
            5,
            date(2025, 3, 11),
            date(2025, 3, 7),
            false,
            2,
        ))
        .await
        .unwrap();
        repo.insert(&Streak::restore(
            without.clone(),
            3,
            3,
            date(2025, 3, 11),
            date(2025, 3, 8),
            false,
            0,
        ))
        .await
        .unwrap();

        let job = StreakReconciliationJob::new(repo.clone());
        let first = job.run(sweep_time(13)).await.unwrap();
        assert_eq!(first, SweepOutcome { frozen: 1, broken: 1, skipped: 0 });

        // Second run the same day: both records now fall outside the filter.
        let second = job.run(sweep_time(13)).await.unwrap();
        assert_eq!(second, SweepOutcome::default());

        let held = repo.find_by_user(&with_freeze).await.unwrap().unwrap();
        assert_eq!(held.freezes_available(), 1);
    }
}
