mod leaderboard_dto;
mod streak_dto;

pub use leaderboard_dto::{ChallengeStandingsDto, StandingDto};
pub use streak_dto::StreakDto;
