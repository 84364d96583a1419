mod leaderboard_queries;
mod streak_queries;

pub use leaderboard_queries::LeaderboardQueries;
pub use streak_queries::StreakQueries;
