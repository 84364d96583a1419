//! In-memory implementations of the domain contracts. These back the engine
//! in tests (and make local experimentation possible without SQLite) while
//! preserving the conditional-update semantics of the real repositories.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use fitpulse_domain::activity::ExerciseKind;
use fitpulse_domain::challenge::{
    Challenge, ChallengeRepository, Participant, ParticipantRepository,
};
use fitpulse_domain::notification::{Notification, NotificationEmitter};
use fitpulse_domain::shared::{ChallengeId, DomainError, UserId};
use fitpulse_domain::streak::{Streak, StreakRepository};

#[derive(Default)]
pub struct InMemoryStreakRepository {
    records: RwLock<HashMap<UserId, Streak>>,
}

impl InMemoryStreakRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreakRepository for InMemoryStreakRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Streak>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(user_id).cloned())
    }

    async fn insert(&self, streak: &Streak) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(streak.user_id()) {
            return Err(DomainError::Conflict(format!(
                "Streak already exists for user {}",
                streak.user_id()
            )));
        }
        records.insert(streak.user_id().clone(), streak.clone());
        Ok(())
    }

    async fn update_if_unchanged(
        &self,
        updated: &Streak,
        expected: &Streak,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        match records.get(updated.user_id()) {
            Some(stored) if stored == expected => {
                records.insert(updated.user_id().clone(), updated.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_stale(&self, cutoff: NaiveDate) -> Result<Vec<Streak>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|s| !s.is_frozen() && s.current_streak() > 0 && s.last_activity_date() < cutoff)
            .cloned()
            .collect())
    }

    async fn find_at_risk(&self, today: NaiveDate) -> Result<Vec<Streak>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|s| s.current_streak() > 0 && s.last_activity_date() < today)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryChallengeRepository {
    records: RwLock<HashMap<ChallengeId, Challenge>>,
}

impl InMemoryChallengeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryChallengeRepository {
    async fn save(&self, challenge: &Challenge) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        records.insert(challenge.id().clone(), challenge.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ChallengeId) -> Result<Option<Challenge>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>, DomainError> {
        let records = self.records.read().await;
        let mut active: Vec<Challenge> = records
            .values()
            .filter(|c| c.is_active(now))
            .cloned()
            .collect();
        active.sort_by_key(|c| c.end_date());
        Ok(active)
    }

    async fn find_ending_soon(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|c| {
                c.end_date() >= now
                    && c.end_date() <= until
                    && c.ending_soon_notified_at().is_none()
            })
            .cloned()
            .collect())
    }

    async fn find_ended_unannounced(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|c| c.has_ended(now) && !c.winners_announced())
            .cloned()
            .collect())
    }

    async fn mark_winners_announced(&self, id: &ChallengeId) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(challenge) => Ok(challenge.announce_winners()),
            None => Ok(false),
        }
    }

    async fn mark_ending_soon_notified(
        &self,
        id: &ChallengeId,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(challenge) if challenge.ending_soon_notified_at().is_none() => {
                challenge.mark_ending_soon_notified(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub struct InMemoryParticipantRepository {
    records: RwLock<HashMap<(ChallengeId, UserId), Participant>>,
    challenges: Arc<InMemoryChallengeRepository>,
}

impl InMemoryParticipantRepository {
    /// Shares the challenge store so the active-participation join sees the
    /// same challenges the lifecycle sweeps do.
    pub fn new(challenges: Arc<InMemoryChallengeRepository>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            challenges,
        }
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn save(&self, participant: &Participant) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        records.insert(
            (
                participant.challenge_id().clone(),
                participant.user_id().clone(),
            ),
            participant.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        challenge_id: &ChallengeId,
        user_id: &UserId,
    ) -> Result<Option<Participant>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(challenge_id.clone(), user_id.clone()))
            .cloned())
    }

    async fn find_by_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Participant>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|p| p.challenge_id() == challenge_id)
            .cloned()
            .collect())
    }

    async fn find_active_for_user(
        &self,
        user_id: &UserId,
        kind: ExerciseKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Participant, Challenge)>, DomainError> {
        let records = self.records.read().await;
        let mut matches = Vec::new();
        for participant in records.values().filter(|p| p.user_id() == user_id) {
            if let Some(challenge) = self.challenges.find_by_id(participant.challenge_id()).await? {
                if challenge.exercise_kind() == kind && challenge.is_active(now) {
                    matches.push((participant.clone(), challenge));
                }
            }
        }
        Ok(matches)
    }

    async fn update_progress_if_unchanged(
        &self,
        participant: &Participant,
        expected_progress: f64,
    ) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        let key = (
            participant.challenge_id().clone(),
            participant.user_id().clone(),
        );
        match records.get(&key) {
            Some(stored) if stored.current_progress() == expected_progress => {
                records.insert(key, participant.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Captures emitted notifications for assertions.
#[derive(Default)]
pub struct InMemoryNotificationSink {
    sent: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, user_id: &UserId) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.user_id() == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationEmitter for InMemoryNotificationSink {
    async fn emit(&self, notification: Notification) -> Result<(), DomainError> {
        let mut sent = self.sent.write().await;
        sent.push(notification);
        Ok(())
    }
}
