use serde::{Deserialize, Serialize};

use fitpulse_domain::streak::Streak;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakDto {
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: String, // ISO 8601 date (YYYY-MM-DD)
    pub streak_start_date: String,  // ISO 8601 date (YYYY-MM-DD)
    pub state: String,
    pub is_frozen: bool,
    pub freezes_available: u32,
}

impl From<&Streak> for StreakDto {
    fn from(streak: &Streak) -> Self {
        Self {
            user_id: streak.user_id().to_string(),
            current_streak: streak.current_streak(),
            longest_streak: streak.longest_streak(),
            last_activity_date: streak.last_activity_date().format("%Y-%m-%d").to_string(),
            streak_start_date: streak.streak_start_date().format("%Y-%m-%d").to_string(),
            state: streak.state().as_str().to_string(),
            is_frozen: streak.is_frozen(),
            freezes_available: streak.freezes_available(),
        }
    }
}
