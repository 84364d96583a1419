use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    StreakReminder,
    StreakMilestoneAtRisk,
    ChallengeGoalReached,
    ChallengeEndingSoon,
    ChallengeWon,
    ChallengeCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::StreakReminder => "STREAK_REMINDER",
            NotificationKind::StreakMilestoneAtRisk => "STREAK_MILESTONE_AT_RISK",
            NotificationKind::ChallengeGoalReached => "CHALLENGE_GOAL_REACHED",
            NotificationKind::ChallengeEndingSoon => "CHALLENGE_ENDING_SOON",
            NotificationKind::ChallengeWon => "CHALLENGE_WON",
            NotificationKind::ChallengeCompleted => "CHALLENGE_COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "STREAK_REMINDER" => Ok(NotificationKind::StreakReminder),
            "STREAK_MILESTONE_AT_RISK" => Ok(NotificationKind::StreakMilestoneAtRisk),
            "CHALLENGE_GOAL_REACHED" => Ok(NotificationKind::ChallengeGoalReached),
            "CHALLENGE_ENDING_SOON" => Ok(NotificationKind::ChallengeEndingSoon),
            "CHALLENGE_WON" => Ok(NotificationKind::ChallengeWon),
            "CHALLENGE_COMPLETED" => Ok(NotificationKind::ChallengeCompleted),
            other => Err(DomainError::Validation(format!(
                "Unknown notification kind: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Write-once notification row. The engine decides when one is emitted and
/// with what content; storage/delivery (and the later "mark read" mutation)
/// belong to a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    kind: NotificationKind,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind,
            title: title.into(),
            content: content.into(),
            created_at,
            is_read: false,
        }
    }

    /// Reconstruct from persistence.
    pub fn restore(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        title: String,
        content: String,
        created_at: DateTime<Utc>,
        is_read: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            title,
            content,
            created_at,
            is_read,
        }
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_round_trips() {
        for kind in [
            NotificationKind::StreakReminder,
            NotificationKind::StreakMilestoneAtRisk,
            NotificationKind::ChallengeGoalReached,
            NotificationKind::ChallengeEndingSoon,
            NotificationKind::ChallengeWon,
            NotificationKind::ChallengeCompleted,
        ] {
            assert_eq!(NotificationKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_new_notification_is_unread() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap();
        let n = Notification::new(
            UserId::new(),
            NotificationKind::StreakReminder,
            "Maintain Your Streak!",
            "Don't forget to log an activity today",
            at,
        );
        assert!(!n.is_read());
        assert_eq!(n.created_at(), at);
    }
}
