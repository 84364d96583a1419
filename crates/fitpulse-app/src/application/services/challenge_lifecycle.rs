use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

use fitpulse_domain::challenge::{
    ranked, Challenge, ChallengeRepository, Participant, ParticipantRepository,
};
use fitpulse_domain::notification::{Notification, NotificationEmitter, NotificationKind};
use fitpulse_domain::shared::DomainError;

/// How close to the end a challenge counts as "ending soon".
const ENDING_SOON_WINDOW_HOURS: i64 = 24;

/// Tally of one lifecycle run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub ending_soon_notified: u32,
    pub finalized: u32,
    pub leaderboards_refreshed: u32,
}

/// Scheduled challenge maintenance: warn participants of imminent endings,
/// finalize ended challenges exactly once, and re-derive leaderboards for
/// the active ones. Every pass re-queries its own predicate, so an
/// interrupted run resumes by simply running again.
pub struct ChallengeLifecycleJob {
    challenges: Arc<dyn ChallengeRepository>,
    participants: Arc<dyn ParticipantRepository>,
    emitter: Arc<dyn NotificationEmitter>,
}

impl ChallengeLifecycleJob {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        participants: Arc<dyn ParticipantRepository>,
        emitter: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            challenges,
            participants,
            emitter,
        }
    }

    /// Run the three sweeps back to back. Each is independent: one failing
    /// wholesale does not stop the others.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> LifecycleOutcome {
        let mut outcome = LifecycleOutcome::default();

        match self.finalize_completed(now).await {
            Ok(finalized) => outcome.finalized = finalized,
            Err(e) => error!(error = %e, "Challenge finalization sweep failed"),
        }

        match self.notify_ending_soon(now).await {
            Ok(notified) => outcome.ending_soon_notified = notified,
            Err(e) => error!(error = %e, "Ending-soon sweep failed"),
        }

        match self.refresh_leaderboards(now).await {
            Ok(refreshed) => outcome.leaderboards_refreshed = refreshed,
            Err(e) => error!(error = %e, "Leaderboard refresh failed"),
        }

        outcome
    }

    /// Warn every participant of challenges ending within the next 24 hours.
    /// The per-challenge stamp makes repeat runs inside the window no-ops.
    pub async fn notify_ending_soon(&self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        let until = now + Duration::hours(ENDING_SOON_WINDOW_HOURS);
        let ending = self.challenges.find_ending_soon(now, until).await?;

        info!(challenges = ending.len(), "Found challenges ending within 24 hours");

        let mut notified = 0;
        for challenge in ending {
            match self.notify_ending_soon_for(&challenge, now).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    error!(
                        challenge_id = %challenge.id(),
                        error = %e,
                        "Failed to send ending-soon notifications, continuing"
                    );
                }
            }
        }

        Ok(notified)
    }

    async fn notify_ending_soon_for(
        &self,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let participants = self.participants.find_by_challenge(challenge.id()).await?;

        for participant in &participants {
            self.emit_or_log(Notification::new(
                participant.user_id().clone(),
                NotificationKind::ChallengeEndingSoon,
                "Challenge Ending Soon",
                format!(
                    "The \"{}\" challenge is ending in less than 24 hours. Make your final push!",
                    challenge.name()
                ),
                now,
            ))
            .await;
        }

        // Stamp after the fan-out: a crash mid-loop re-notifies on the next
        // run (at-least-once) instead of silently dropping the warning.
        self.challenges
            .mark_ending_soon_notified(challenge.id(), now)
            .await?;

        Ok(())
    }

    /// Close out ended challenges: rank, announce, latch. The conditional
    /// `winners_announced` latch is the linearization point that caps the
    /// announcement at once per challenge across any number of runs.
    pub async fn finalize_completed(&self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        let ended = self.challenges.find_ended_unannounced(now).await?;

        info!(challenges = ended.len(), "Processing completed challenges");

        let mut finalized = 0;
        for challenge in ended {
            match self.finalize_one(&challenge, now).await {
                Ok(()) => finalized += 1,
                Err(e) => {
                    error!(
                        challenge_id = %challenge.id(),
                        error = %e,
                        "Failed to finalize challenge, continuing"
                    );
                }
            }
        }

        Ok(finalized)
    }

    async fn finalize_one(
        &self,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let standings = ranked(self.participants.find_by_challenge(challenge.id()).await?);

        if let Some(winner) = standings.first().cloned() {
            for participant in &standings {
                let is_winner = participant.user_id() == winner.user_id();
                self.emit_or_log(completion_notice(
                    challenge,
                    participant,
                    &winner,
                    is_winner,
                    now,
                ))
                .await;
            }

            let creator_participates = standings
                .iter()
                .any(|p| p.user_id() == challenge.creator_id());
            if !creator_participates {
                self.emit_or_log(Notification::new(
                    challenge.creator_id().clone(),
                    NotificationKind::ChallengeCompleted,
                    "Your Challenge Completed",
                    format!(
                        "Your challenge \"{}\" has ended. {} won with {} {}!",
                        challenge.name(),
                        winner.display_name(),
                        winner.current_progress(),
                        challenge.exercise_kind().as_str().to_lowercase()
                    ),
                    now,
                ))
                .await;
            }
        }

        // A challenge nobody joined is latched silently so the sweep stops
        // rescanning it.
        let latched = self.challenges.mark_winners_announced(challenge.id()).await?;
        if latched {
            info!(
                challenge_id = %challenge.id(),
                participants = standings.len(),
                "Challenge finalized"
            );
        }

        Ok(())
    }

    /// Cache-warming pass over the active challenges: re-derive and log the
    /// sorted standings. Touches no persisted state.
    pub async fn refresh_leaderboards(&self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        let active = self.challenges.find_active(now).await?;

        info!(challenges = active.len(), "Refreshing challenge leaderboards");

        let mut refreshed = 0;
        for challenge in active {
            match self.participants.find_by_challenge(challenge.id()).await {
                Ok(participants) => {
                    let standings = ranked(participants);
                    let leader = standings
                        .first()
                        .map(|p| p.display_name().to_string())
                        .unwrap_or_default();
                    info!(
                        challenge_id = %challenge.id(),
                        participants = standings.len(),
                        leader = %leader,
                        "Leaderboard refreshed"
                    );
                    refreshed += 1;
                }
                Err(e) => {
                    error!(
                        challenge_id = %challenge.id(),
                        error = %e,
                        "Failed to refresh leaderboard, continuing"
                    );
                }
            }
        }

        Ok(refreshed)
    }

    async fn emit_or_log(&self, notification: Notification) {
        let user_id = notification.user_id().clone();
        let kind = notification.kind();
        if let Err(e) = self.emitter.emit(notification).await {
            error!(
                user_id = %user_id,
                kind = %kind,
                error = %e,
                "Failed to emit challenge notification"
            );
        }
    }
}

fn completion_notice(
    challenge: &Challenge,
    participant: &Participant,
    winner: &Participant,
    is_winner: bool,
    now: DateTime<Utc>,
) -> Notification {
    if is_winner {
        Notification::new(
            participant.user_id().clone(),
            NotificationKind::ChallengeWon,
            "You Won a Challenge!",
            format!(
                "Congratulations! You won the \"{}\" challenge!",
                challenge.name()
            ),
            now,
        )
    } else {
        Notification::new(
            participant.user_id().clone(),
            NotificationKind::ChallengeCompleted,
            "Challenge Completed",
            format!(
                "The \"{}\" challenge has ended. {} won with {} {}!",
                challenge.name(),
                winner.display_name(),
                winner.current_progress(),
                challenge.exercise_kind().as_str().to_lowercase()
            ),
            now,
        )
    }
}
