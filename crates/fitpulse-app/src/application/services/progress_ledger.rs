use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

use fitpulse_domain::activity::ExerciseKind;
use fitpulse_domain::challenge::{Challenge, Participant, ParticipantRepository};
use fitpulse_domain::notification::{Notification, NotificationEmitter, NotificationKind};
use fitpulse_domain::shared::{DomainError, UserId};

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Aggregates logged exercise into challenge standings. Each matching
/// participation is an independent unit of work: one failing row is logged
/// and skipped, the rest still update.
pub struct ProgressLedger {
    participants: Arc<dyn ParticipantRepository>,
    emitter: Arc<dyn NotificationEmitter>,
}

impl ProgressLedger {
    pub fn new(
        participants: Arc<dyn ParticipantRepository>,
        emitter: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            participants,
            emitter,
        }
    }

    /// Apply one logged exercise to every active matching participation.
    /// No matching challenge is a normal no-op. Returns how many rows were
    /// updated.
    #[instrument(skip(self), fields(user_id = %user_id, kind = %kind))]
    pub async fn apply_exercise(
        &self,
        user_id: &UserId,
        kind: ExerciseKind,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<u32, DomainError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::Validation(format!(
                "Exercise amount must be positive, got {}",
                amount
            )));
        }

        let participations = self
            .participants
            .find_active_for_user(user_id, kind, now)
            .await?;

        if participations.is_empty() {
            return Ok(0);
        }

        info!(
            user_id = %user_id,
            challenges = participations.len(),
            "Updating challenge progress"
        );

        let mut updated = 0;
        for (participant, challenge) in participations {
            match self
                .update_participant(participant, &challenge, amount, now)
                .await
            {
                Ok(()) => updated += 1,
                Err(e) => {
                    // One failing participation must not starve the others.
                    error!(
                        user_id = %user_id,
                        challenge_id = %challenge.id(),
                        error = %e,
                        "Failed to update challenge progress, continuing"
                    );
                }
            }
        }

        Ok(updated)
    }

    async fn update_participant(
        &self,
        participant: Participant,
        challenge: &Challenge,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut current = participant;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let snapshot = current.current_progress();
            let mut updated = current.clone();
            let crossing = updated.add_progress(amount, challenge.goal_amount(), now);

            if self
                .participants
                .update_progress_if_unchanged(&updated, snapshot)
                .await?
            {
                info!(
                    user_id = %updated.user_id(),
                    challenge_id = %challenge.id(),
                    progress = updated.current_progress(),
                    "Challenge progress updated"
                );

                // The crossing test ran against the same previous value the
                // conditional update was guarded on, so it fires exactly
                // once per goal no matter how often the event is replayed.
                if crossing.crossed {
                    self.notify_goal_reached(updated.user_id(), challenge, now)
                        .await;
                }
                return Ok(());
            }

            // Lost the race: re-read and recompute against fresh state.
            current = self
                .participants
                .find(challenge.id(), current.user_id())
                .await?
                .ok_or_else(|| {
                    DomainError::NotFound(format!(
                        "Participant vanished from challenge {}",
                        challenge.id()
                    ))
                })?;
        }

        Err(DomainError::Conflict(format!(
            "Participant in challenge {} stayed contended after {} attempts",
            challenge.id(),
            MAX_WRITE_ATTEMPTS
        )))
    }

    async fn notify_goal_reached(
        &self,
        user_id: &UserId,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) {
        let notification = Notification::new(
            user_id.clone(),
            NotificationKind::ChallengeGoalReached,
            "Challenge Goal Reached!",
            format!(
                "You've reached your goal in the \"{}\" challenge! Keep going to secure your position!",
                challenge.name()
            ),
            now,
        );

        // Best effort: a lost notification never rolls back the progress
        // update that triggered it.
        if let Err(e) = self.emitter.emit(notification).await {
            error!(
                user_id = %user_id,
                challenge_id = %challenge.id(),
                error = %e,
                "Failed to emit goal-reached notification"
            );
        }
    }
}
