use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ExerciseKind;
use crate::shared::{ChallengeId, DomainError, UserId};

/// Time-boxed, goal-based competition over a single exercise kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    id: ChallengeId,
    name: String,
    exercise_kind: ExerciseKind,
    goal_amount: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    creator_id: UserId,
    winners_announced: bool,
    ending_soon_notified_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn new(
        name: String,
        exercise_kind: ExerciseKind,
        goal_amount: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        creator_id: UserId,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Challenge name cannot be empty".to_string(),
            ));
        }

        if !goal_amount.is_finite() || goal_amount <= 0.0 {
            return Err(DomainError::Validation(format!(
                "Challenge goal must be positive, got {}",
                goal_amount
            )));
        }

        if end_date <= start_date {
            return Err(DomainError::Validation(
                "Challenge must end after it starts".to_string(),
            ));
        }

        Ok(Self {
            id: ChallengeId::new(),
            name: name.trim().to_string(),
            exercise_kind,
            goal_amount,
            start_date,
            end_date,
            creator_id,
            winners_announced: false,
            ending_soon_notified_at: None,
        })
    }

    /// Reconstruct from persistence.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ChallengeId,
        name: String,
        exercise_kind: ExerciseKind,
        goal_amount: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        creator_id: UserId,
        winners_announced: bool,
        ending_soon_notified_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name,
            exercise_kind,
            goal_amount,
            start_date,
            end_date,
            creator_id,
            winners_announced,
            ending_soon_notified_at,
        }
    }

    // Getters

    pub fn id(&self) -> &ChallengeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exercise_kind(&self) -> ExerciseKind {
        self.exercise_kind
    }

    pub fn goal_amount(&self) -> f64 {
        self.goal_amount
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn creator_id(&self) -> &UserId {
        &self.creator_id
    }

    pub fn winners_announced(&self) -> bool {
        self.winners_announced
    }

    pub fn ending_soon_notified_at(&self) -> Option<DateTime<Utc>> {
        self.ending_soon_notified_at
    }

    // Business methods

    /// Progress accrues only inside the challenge window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }

    pub fn ends_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.end_date >= now && self.end_date <= now + window
    }

    /// One-shot latch guarding finalization side effects. Returns false when
    /// the winners were already announced.
    pub fn announce_winners(&mut self) -> bool {
        if self.winners_announced {
            return false;
        }
        self.winners_announced = true;
        true
    }

    pub fn mark_ending_soon_notified(&mut self, at: DateTime<Utc>) {
        self.ending_soon_notified_at = Some(at);
    }
}

/// Result of applying exercise to a participant's running total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalCrossing {
    pub previous: f64,
    pub current: f64,
    pub crossed: bool,
}

/// Per-(challenge, user) progress ledger entry. Progress is only ever
/// increased by the engine; leaving a challenge is a separate CRUD concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    challenge_id: ChallengeId,
    user_id: UserId,
    display_name: String,
    current_progress: f64,
    joined_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl Participant {
    pub fn join(
        challenge_id: ChallengeId,
        user_id: UserId,
        display_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            challenge_id,
            user_id,
            display_name,
            current_progress: 0.0,
            joined_at: now,
            last_updated: now,
        }
    }

    /// Reconstruct from persistence.
    pub fn restore(
        challenge_id: ChallengeId,
        user_id: UserId,
        display_name: String,
        current_progress: f64,
        joined_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            challenge_id,
            user_id,
            display_name,
            current_progress,
            joined_at,
            last_updated,
        }
    }

    // Getters

    pub fn challenge_id(&self) -> &ChallengeId {
        &self.challenge_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn current_progress(&self) -> f64 {
        self.current_progress
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    // Business methods

    /// Add qualifying exercise to the running total and report whether this
    /// update crossed the goal. The strict test against the previous value
    /// makes the crossing fire at most once even under replays, as long as
    /// the previous value was read in the same unit of work as the update.
    pub fn add_progress(&mut self, amount: f64, goal: f64, now: DateTime<Utc>) -> GoalCrossing {
        let previous = self.current_progress;
        self.current_progress += amount;
        self.last_updated = now;

        GoalCrossing {
            previous,
            current: self.current_progress,
            crossed: previous < goal && self.current_progress >= goal,
        }
    }
}

/// Standings order used by finalization and leaderboards: progress
/// descending, ties broken by earliest `last_updated` (first to the score
/// outranks), then by user id so the order is total.
pub fn ranked(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by(|a, b| {
        b.current_progress
            .partial_cmp(&a.current_progress)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.last_updated.cmp(&b.last_updated))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    participants
}
