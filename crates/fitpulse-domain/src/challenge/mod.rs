mod aggregate;
mod repository;

pub use aggregate::{ranked, Challenge, GoalCrossing, Participant};
pub use repository::{ChallengeRepository, ParticipantRepository};
