use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::aggregate::{Challenge, Participant};
use crate::activity::ExerciseKind;
use crate::shared::{ChallengeId, DomainError, UserId};

/// Challenge persistence contract. The lifecycle sweeps re-evaluate these
/// predicates fresh on every run, so a sweep interrupted mid-loop resumes by
/// simply running again.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    async fn save(&self, challenge: &Challenge) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &ChallengeId) -> Result<Option<Challenge>, DomainError>;

    /// Challenges whose window contains `now`.
    async fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>, DomainError>;

    /// Challenges ending inside `[now, now + window]` that have not been
    /// stamped with an ending-soon notification yet.
    async fn find_ending_soon(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError>;

    /// Ended challenges whose winners have not been announced.
    async fn find_ended_unannounced(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError>;

    /// Latch `winners_announced`; applies only while the flag is still
    /// clear. Returns whether this call won the latch.
    async fn mark_winners_announced(&self, id: &ChallengeId) -> Result<bool, DomainError>;

    /// Stamp the ending-soon notification time; applies only while no stamp
    /// exists. Returns whether this call placed the stamp.
    async fn mark_ending_soon_notified(
        &self,
        id: &ChallengeId,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn save(&self, participant: &Participant) -> Result<(), DomainError>;

    async fn find(
        &self,
        challenge_id: &ChallengeId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, DomainError>;

    async fn find_by_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Participant>, DomainError>;

    /// The user's participations in challenges of the given kind whose
    /// window contains `now`, paired with the challenge itself.
    async fn find_active_for_user(
        &self,
        user_id: &UserId,
        kind: ExerciseKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Participant, Challenge)>, DomainError>;

    /// Conditionally replace a participant row: applies only while the
    /// stored progress still equals `expected_progress`, making the
    /// read-compute-write cycle atomic. Returns whether the update applied.
    async fn update_progress_if_unchanged(
        &self,
        participant: &Participant,
        expected_progress: f64,
    ) -> Result<bool, DomainError>;
}
