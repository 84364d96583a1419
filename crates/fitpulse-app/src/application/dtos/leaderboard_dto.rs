use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingDto {
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub progress: f64,
    pub percent_complete: f64, // 0.0 - 100.0, capped at 100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeStandingsDto {
    pub challenge_id: String,
    pub challenge_name: String,
    pub exercise_kind: String,
    pub goal_amount: f64,
    pub standings: Vec<StandingDto>,
}
