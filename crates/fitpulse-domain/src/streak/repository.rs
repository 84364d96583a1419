use async_trait::async_trait;
use chrono::NaiveDate;

use super::aggregate::Streak;
use crate::shared::{DomainError, UserId};

/// Streak persistence contract. Every mutation is a single atomic
/// read-modify-write: `insert` fails with `Conflict` when a record already
/// exists, and `update_if_unchanged` applies only when the stored row still
/// matches the state the caller read, so racing writers (activity events and
/// the daily sweep) can never lose updates silently.
#[async_trait]
pub trait StreakRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Streak>, DomainError>;

    /// Create a new record. Returns `DomainError::Conflict` when one already
    /// exists for the user (the caller re-reads and retries its transition).
    async fn insert(&self, streak: &Streak) -> Result<(), DomainError>;

    /// Conditionally replace the record: applies only while the stored row
    /// still equals `expected`. Returns whether the update was applied.
    async fn update_if_unchanged(
        &self,
        updated: &Streak,
        expected: &Streak,
    ) -> Result<bool, DomainError>;

    /// Records that missed at least one full day: last activity strictly
    /// before `cutoff` (the day before the sweep day), not frozen, and with
    /// a non-zero streak to protect or break.
    async fn find_stale(&self, cutoff: NaiveDate) -> Result<Vec<Streak>, DomainError>;

    /// Records with an active streak and no activity yet on `today`; the
    /// reminder job notifies these users before the day ends.
    async fn find_at_risk(&self, today: NaiveDate) -> Result<Vec<Streak>, DomainError>;
}
