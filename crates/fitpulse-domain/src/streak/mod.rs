mod aggregate;
mod repository;

pub use aggregate::{Streak, StreakChange, StreakState};
pub use repository::StreakRepository;
