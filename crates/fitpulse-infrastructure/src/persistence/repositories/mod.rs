mod challenge_repo;
mod notification_repo;
mod streak_repo;

pub use challenge_repo::{SqliteChallengeRepository, SqliteParticipantRepository};
pub use notification_repo::SqliteNotificationStore;
pub use streak_repo::SqliteStreakRepository;
