use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId};

/// Exercise categories a challenge can be scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseKind {
    Running,
    PushUps,
    SitUps,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Running => "RUNNING",
            ExerciseKind::PushUps => "PUSH_UPS",
            ExerciseKind::SitUps => "SIT_UPS",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "RUNNING" => Ok(ExerciseKind::Running),
            "PUSH_UPS" => Ok(ExerciseKind::PushUps),
            "SIT_UPS" => Ok(ExerciseKind::SitUps),
            other => Err(DomainError::Validation(format!(
                "Unknown exercise kind: {}",
                other
            ))),
        }
    }

    /// Default unit exercises of this kind are logged in.
    pub fn default_unit(&self) -> &'static str {
        match self {
            ExerciseKind::Running => "km",
            ExerciseKind::PushUps | ExerciseKind::SitUps => "reps",
        }
    }
}

impl std::fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged exercise as received from the activity write path. The exercise
/// row itself is owned by a collaborator; this is the event the engine reacts
/// to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedExercise {
    pub user_id: UserId,
    pub kind: ExerciseKind,
    pub amount: f64,
    pub unit: String,
    pub logged_at: DateTime<Utc>,
}

impl LoggedExercise {
    pub fn new(
        user_id: UserId,
        kind: ExerciseKind,
        amount: f64,
        logged_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::Validation(format!(
                "Exercise amount must be positive, got {}",
                amount
            )));
        }

        Ok(Self {
            user_id,
            kind,
            amount,
            unit: kind.default_unit().to_string(),
            logged_at,
        })
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}
