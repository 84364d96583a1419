use std::sync::Arc;
use tracing::instrument;

use fitpulse_domain::activity::LoggedExercise;
use fitpulse_domain::shared::DomainError;
use fitpulse_domain::streak::Streak;

use super::progress_ledger::ProgressLedger;
use super::streak_engine::StreakEngine;

/// What one ingested exercise did to the caller's state.
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub streak: Streak,
    pub challenges_updated: u32,
}

/// Entry point for the activity write path: once the exercise row is durably
/// written, the collaborator calls in here and the event fans out to the
/// streak engine and the progress ledger synchronously.
pub struct ActivityService {
    streak_engine: Arc<StreakEngine>,
    ledger: Arc<ProgressLedger>,
}

impl ActivityService {
    pub fn new(streak_engine: Arc<StreakEngine>, ledger: Arc<ProgressLedger>) -> Self {
        Self {
            streak_engine,
            ledger,
        }
    }

    /// Apply a logged exercise to both trackers. Errors surface to the
    /// caller so the originating write can be retried ("activity saved,
    /// progress pending"); both sides tolerate replays of the same day.
    #[instrument(skip(self, exercise), fields(user_id = %exercise.user_id, kind = %exercise.kind))]
    pub async fn on_exercise_logged(
        &self,
        exercise: &LoggedExercise,
    ) -> Result<ActivityOutcome, DomainError> {
        let streak = self
            .streak_engine
            .record_activity(&exercise.user_id, exercise.logged_at)
            .await?;

        let challenges_updated = self
            .ledger
            .apply_exercise(
                &exercise.user_id,
                exercise.kind,
                exercise.amount,
                exercise.logged_at,
            )
            .await?;

        Ok(ActivityOutcome {
            streak,
            challenges_updated,
        })
    }
}
