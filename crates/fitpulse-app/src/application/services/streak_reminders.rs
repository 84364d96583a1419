use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

use fitpulse_domain::calendar;
use fitpulse_domain::notification::{Notification, NotificationEmitter, NotificationKind};
use fitpulse_domain::shared::DomainError;
use fitpulse_domain::streak::{Streak, StreakRepository};

/// Streak lengths that get the extra at-risk warning.
const MILESTONES: [u32; 6] = [7, 14, 21, 30, 100, 365];

/// Evening job nudging users who have an active streak but no activity yet
/// today.
pub struct StreakReminderJob {
    streaks: Arc<dyn StreakRepository>,
    emitter: Arc<dyn NotificationEmitter>,
}

impl StreakReminderJob {
    pub fn new(streaks: Arc<dyn StreakRepository>, emitter: Arc<dyn NotificationEmitter>) -> Self {
        Self { streaks, emitter }
    }

    /// Remind every at-risk user; milestone streaks get a second, more
    /// urgent notification. Returns how many users were reminded.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        let today = calendar::day_of(now);
        let at_risk = self.streaks.find_at_risk(today).await?;

        info!(users = at_risk.len(), "Sending streak reminders");

        let mut reminded = 0;
        for streak in at_risk {
            self.emit_or_log(reminder(&streak, now)).await;

            if MILESTONES.contains(&streak.current_streak()) {
                self.emit_or_log(milestone_at_risk(&streak, now)).await;
            }

            reminded += 1;
        }

        Ok(reminded)
    }

    async fn emit_or_log(&self, notification: Notification) {
        let user_id = notification.user_id().clone();
        if let Err(e) = self.emitter.emit(notification).await {
            error!(user_id = %user_id, error = %e, "Failed to emit streak reminder");
        }
    }
}

fn reminder(streak: &Streak, now: DateTime<Utc>) -> Notification {
    Notification::new(
        streak.user_id().clone(),
        NotificationKind::StreakReminder,
        "Maintain Your Streak!",
        format!(
            "Don't forget to log an activity today to maintain your {} day streak!",
            streak.current_streak()
        ),
        now,
    )
}

fn milestone_at_risk(streak: &Streak, now: DateTime<Utc>) -> Notification {
    Notification::new(
        streak.user_id().clone(),
        NotificationKind::StreakMilestoneAtRisk,
        "Milestone Streak at Risk!",
        format!(
            "Your {} day streak milestone is at risk! Log an activity today to maintain it!",
            streak.current_streak()
        ),
        now,
    )
}
