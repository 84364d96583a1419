mod activity;
mod challenge_lifecycle;
mod progress_ledger;
mod scheduler;
mod streak_engine;
mod streak_reminders;
mod streak_sweep;

pub use activity::{ActivityOutcome, ActivityService};
pub use challenge_lifecycle::{ChallengeLifecycleJob, LifecycleOutcome};
pub use progress_ledger::ProgressLedger;
pub use scheduler::SweepScheduler;
pub use streak_engine::StreakEngine;
pub use streak_reminders::StreakReminderJob;
pub use streak_sweep::{StreakReconciliationJob, SweepOutcome};
