use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use fitpulse_domain::calendar;
use fitpulse_domain::shared::{DomainError, UserId};
use fitpulse_domain::streak::{Streak, StreakChange, StreakRepository};

/// Attempts per logical write before giving up on a contended record. The
/// transition functions are pure recomputations of the freshly read state,
/// so losing a conditional update is always safe to retry.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Applies the streak transition table on behalf of the activity write path
/// and the freeze-award operation. All writes go through insert-or-CAS so
/// racing events, awards and sweep mutations serialize per user.
pub struct StreakEngine {
    streaks: Arc<dyn StreakRepository>,
}

impl StreakEngine {
    pub fn new(streaks: Arc<dyn StreakRepository>) -> Self {
        Self { streaks }
    }

    /// Apply one logged activity. Same-day repeats and out-of-order replays
    /// return the record unchanged; missed days consume freeze protection or
    /// restart the streak per the transition table.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn record_activity(
        &self,
        user_id: &UserId,
        logged_at: DateTime<Utc>,
    ) -> Result<Streak, DomainError> {
        let day = calendar::day_of(logged_at);

        for _ in 0..MAX_WRITE_ATTEMPTS {
            match self.streaks.find_by_user(user_id).await? {
                None => {
                    let streak = Streak::started(user_id.clone(), day);
                    match self.streaks.insert(&streak).await {
                        Ok(()) => {
                            info!(user_id = %user_id, "Streak started");
                            return Ok(streak);
                        }
                        // Another writer created the record first; re-read
                        // and run the transition against it.
                        Err(DomainError::Conflict(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Some(expected) => {
                    let mut streak = expected.clone();
                    let change = streak.record_activity(day);

                    if change == StreakChange::Unchanged {
                        return Ok(streak);
                    }

                    if self.streaks.update_if_unchanged(&streak, &expected).await? {
                        info!(
                            user_id = %user_id,
                            change = ?change,
                            current_streak = streak.current_streak(),
                            "Streak updated"
                        );
                        return Ok(streak);
                    }

                    warn!(user_id = %user_id, "Streak write lost a race, retrying");
                }
            }
        }

        Err(DomainError::Conflict(format!(
            "Streak for user {} stayed contended after {} attempts",
            user_id, MAX_WRITE_ATTEMPTS
        )))
    }

    /// Bank freezes for a user, creating a zero-length record if none exists
    /// yet. Awarding is not an activity: the streak itself is untouched.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn award_freezes(
        &self,
        user_id: &UserId,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Streak, DomainError> {
        if count == 0 {
            return Err(DomainError::Validation(
                "Freeze award count must be positive".to_string(),
            ));
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            match self.streaks.find_by_user(user_id).await? {
                None => {
                    let streak = Streak::banked(user_id.clone(), calendar::day_of(now), count);
                    match self.streaks.insert(&streak).await {
                        Ok(()) => {
                            info!(user_id = %user_id, count, "Freezes banked on new record");
                            return Ok(streak);
                        }
                        Err(DomainError::Conflict(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Some(expected) => {
                    let mut streak = expected.clone();
                    streak.add_freezes(count);

                    if self.streaks.update_if_unchanged(&streak, &expected).await? {
                        info!(
                            user_id = %user_id,
                            count,
                            freezes_available = streak.freezes_available(),
                            "Freezes awarded"
                        );
                        return Ok(streak);
                    }

                    warn!(user_id = %user_id, "Freeze award lost a race, retrying");
                }
            }
        }

        Err(DomainError::Conflict(format!(
            "Streak for user {} stayed contended after {} attempts",
            user_id, MAX_WRITE_ATTEMPTS
        )))
    }

    /// Read-only projection for collaborators.
    pub async fn get_streak(&self, user_id: &UserId) -> Result<Option<Streak>, DomainError> {
        self.streaks.find_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitpulse_infrastructure::memory::InMemoryStreakRepository;

    fn engine() -> StreakEngine {
        StreakEngine::new(Arc::new(InMemoryStreakRepository::new()))
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_activity_creates_record() {
        let engine = engine();
        let user = UserId::new();

        let streak = engine
            .record_activity(&user, at(2025, 3, 10, 9))
            .await
            .unwrap();
        assert_eq!(streak.current_streak(), 1);
        assert_eq!(streak.longest_streak(), 1);
    }

    #[tokio::test]
    async fn test_same_day_logging_is_idempotent() {
        let engine = engine();
        let user = UserId::new();

        engine.record_activity(&user, at(2025, 3, 10, 9)).await.unwrap();
        let morning = engine
            .record_activity(&user, at(2025, 3, 11, 7))
            .await
            .unwrap();
        let evening = engine
            .record_activity(&user, at(2025, 3, 11, 21))
            .await
            .unwrap();

        assert_eq!(morning.current_streak(), 2);
        assert_eq!(evening, morning);
        assert_eq!(
            engine.get_streak(&user).await.unwrap().unwrap(),
            morning
        );
    }

    #[tokio::test]
    async fn test_week_with_forgiven_gap() {
        // Monday through Tuesday, a skipped Wednesday covered by a freeze,
        // then Thursday lands on 7.
        let engine = engine();
        let user = UserId::new();

        for day in 5..=10 {
            engine.record_activity(&user, at(2025, 3, day, 18)).await.unwrap();
        }
        engine.award_freezes(&user, 1, at(2025, 3, 10, 19)).await.unwrap();

        let tuesday = engine
            .record_activity(&user, at(2025, 3, 11, 18))
            .await
            .unwrap();
        assert_eq!(tuesday.current_streak(), 7);

        let thursday = engine
            .record_activity(&user, at(2025, 3, 13, 18))
            .await
            .unwrap();
        assert_eq!(thursday.current_streak(), 8);
        assert_eq!(thursday.freezes_available(), 0);
        assert!(!thursday.is_frozen());
    }

    #[tokio::test]
    async fn test_unprotected_gap_restarts() {
        let engine = engine();
        let user = UserId::new();

        engine.record_activity(&user, at(2025, 3, 10, 9)).await.unwrap();
        engine.record_activity(&user, at(2025, 3, 11, 9)).await.unwrap();

        let friday = engine
            .record_activity(&user, at(2025, 3, 14, 9))
            .await
            .unwrap();
        assert_eq!(friday.current_streak(), 1);
        assert_eq!(friday.longest_streak(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_event_does_not_regress() {
        let engine = engine();
        let user = UserId::new();

        engine.record_activity(&user, at(2025, 3, 10, 9)).await.unwrap();
        engine.record_activity(&user, at(2025, 3, 11, 9)).await.unwrap();

        // A delayed client retry from Monday arrives after Tuesday's event.
        let replayed = engine
            .record_activity(&user, at(2025, 3, 10, 8))
            .await
            .unwrap();
        assert_eq!(replayed.current_streak(), 2);
        assert_eq!(
            replayed.last_activity_date(),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
        );
    }

    #[tokio::test]
    async fn test_freezes_bank_before_first_activity() {
        let engine = engine();
        let user = UserId::new();

        let banked = engine
            .award_freezes(&user, 2, at(2025, 3, 10, 12))
            .await
            .unwrap();
        assert_eq!(banked.current_streak(), 0);
        assert_eq!(banked.freezes_available(), 2);

        // First activity starts at 1 without touching the bank.
        let started = engine
            .record_activity(&user, at(2025, 3, 12, 9))
            .await
            .unwrap();
        assert_eq!(started.current_streak(), 1);
        assert_eq!(started.freezes_available(), 2);
    }

    #[tokio::test]
    async fn test_zero_count_award_is_rejected() {
        let engine = engine();
        let result = engine
            .award_freezes(&UserId::new(), 0, at(2025, 3, 10, 12))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
