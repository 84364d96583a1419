use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::shared::UserId;

/// Consecutive-activity streak for a single user. Created lazily on the first
/// logged activity (or when freezes are banked ahead of it) and never
/// deleted; a broken streak keeps its record with `current_streak` at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    user_id: UserId,
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: NaiveDate,
    streak_start_date: NaiveDate,
    is_frozen: bool,
    freezes_available: u32,
}

/// Observable state of a streak record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakState {
    /// Counting, not under a pending freeze.
    Active,
    /// A missed day was covered by a freeze; the streak is preserved until
    /// the next activity resolves the hold.
    FrozenHold,
    /// Reset to zero by the daily sweep (or never started).
    Broken,
}

impl StreakState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakState::Active => "ACTIVE",
            StreakState::FrozenHold => "FROZEN_HOLD",
            StreakState::Broken => "BROKEN",
        }
    }
}

/// Outcome of applying one activity to a streak record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First counted day (fresh record, or a record at zero).
    Started,
    /// Same-day repeat or out-of-order replay; nothing moved.
    Unchanged,
    /// Consecutive day, count incremented.
    Extended,
    /// A gap was covered by freeze protection and the catch-up day counted.
    /// `freeze_consumed` is false when the daily sweep already spent the
    /// freeze and left the record in its frozen hold.
    Forgiven { freeze_consumed: bool },
    /// Unprotected gap; the streak restarted at one.
    Restarted,
}

impl Streak {
    /// Record for a user's first counted activity day.
    pub fn started(user_id: UserId, day: NaiveDate) -> Self {
        Self {
            user_id,
            current_streak: 1,
            longest_streak: 1,
            last_activity_date: day,
            streak_start_date: day,
            is_frozen: false,
            freezes_available: 0,
        }
    }

    /// Zero-length record created when freezes are banked before the user
    /// has ever logged activity.
    pub fn banked(user_id: UserId, day: NaiveDate, freezes: u32) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: day,
            streak_start_date: day,
            is_frozen: false,
            freezes_available: freezes,
        }
    }

    /// Reconstruct from persistence.
    pub fn restore(
        user_id: UserId,
        current_streak: u32,
        longest_streak: u32,
        last_activity_date: NaiveDate,
        streak_start_date: NaiveDate,
        is_frozen: bool,
        freezes_available: u32,
    ) -> Self {
        Self {
            user_id,
            current_streak,
            longest_streak,
            last_activity_date,
            streak_start_date,
            is_frozen,
            freezes_available,
        }
    }

    // Getters

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    pub fn last_activity_date(&self) -> NaiveDate {
        self.last_activity_date
    }

    pub fn streak_start_date(&self) -> NaiveDate {
        self.streak_start_date
    }

    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    pub fn freezes_available(&self) -> u32 {
        self.freezes_available
    }

    pub fn state(&self) -> StreakState {
        if self.is_frozen {
            StreakState::FrozenHold
        } else if self.current_streak > 0 {
            StreakState::Active
        } else {
            StreakState::Broken
        }
    }

    // Business methods

    /// Apply one activity day. Same-day repeats and out-of-order replays
    /// leave the record untouched, so the transition is idempotent per day
    /// and can never regress the streak.
    pub fn record_activity(&mut self, day: NaiveDate) -> StreakChange {
        // A zero-length record (broken by the sweep, or banked freezes with
        // no activity yet) has nothing to extend or protect: any activity
        // starts a fresh streak.
        if self.current_streak == 0 {
            self.current_streak = 1;
            self.longest_streak = self.longest_streak.max(1);
            self.last_activity_date = day;
            self.streak_start_date = day;
            self.is_frozen = false;
            return StreakChange::Started;
        }

        if calendar::same_day(self.last_activity_date, day)
            || calendar::days_between(self.last_activity_date, day) < 0
        {
            return StreakChange::Unchanged;
        }

        if calendar::is_yesterday(self.last_activity_date, day) {
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
            self.last_activity_date = day;
            self.is_frozen = false;
            return StreakChange::Extended;
        }

        // Gap of more than one day: forgivable if a freeze already covers it
        // or one is available. The missed day is filled by the freeze and the
        // catch-up activity still counts as a new streak day.
        if self.is_frozen || self.freezes_available > 0 {
            let freeze_consumed = if self.is_frozen {
                // The sweep already spent the freeze when it froze the record.
                false
            } else {
                self.freezes_available -= 1;
                true
            };
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
            self.last_activity_date = day;
            self.is_frozen = false;
            return StreakChange::Forgiven { freeze_consumed };
        }

        self.current_streak = 1;
        self.last_activity_date = day;
        self.streak_start_date = day;
        self.is_frozen = false;
        StreakChange::Restarted
    }

    pub fn add_freezes(&mut self, count: u32) {
        self.freezes_available += count;
    }

    /// True when the record missed at least one full day and is not already
    /// held by a freeze. Zero-length streaks are never stale: there is
    /// nothing to protect or break.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.current_streak > 0
            && !self.is_frozen
            && self.last_activity_date < calendar::yesterday(today)
    }

    /// Daily-sweep action: spend one freeze to hold the streak through a
    /// missed day. Returns false when no freeze is available or the record
    /// is already frozen (nothing to consume twice).
    pub fn freeze_missed_day(&mut self) -> bool {
        if self.is_frozen || self.freezes_available == 0 {
            return false;
        }
        self.freezes_available -= 1;
        self.is_frozen = true;
        true
    }

    /// Daily-sweep action: hard break. The longest streak is a high-water
    /// mark and survives.
    pub fn break_streak(&mut self) {
        self.current_streak = 0;
        self.is_frozen = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monday() -> NaiveDate {
        date(2025, 3, 10)
    }

    #[test]
    fn test_first_activity_starts_at_one() {
        let s = Streak::started(UserId::new(), monday());
        assert_eq!(s.current_streak(), 1);
        assert_eq!(s.longest_streak(), 1);
        assert_eq!(s.streak_start_date(), monday());
        assert_eq!(s.state(), StreakState::Active);
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let mut s = Streak::started(UserId::new(), monday());
        let tue = date(2025, 3, 11);
        assert_eq!(s.record_activity(tue), StreakChange::Extended);
        assert_eq!(s.current_streak(), 2);

        let before = s.clone();
        assert_eq!(s.record_activity(tue), StreakChange::Unchanged);
        assert_eq!(s, before);
    }

    #[test]
    fn test_out_of_order_replay_does_not_regress() {
        let mut s = Streak::started(UserId::new(), monday());
        s.record_activity(date(2025, 3, 11));

        let before = s.clone();
        assert_eq!(s.record_activity(monday()), StreakChange::Unchanged);
        assert_eq!(s, before);
    }

    #[test]
    fn test_consecutive_days_increment() {
        let mut s = Streak::started(UserId::new(), monday());
        assert_eq!(s.record_activity(date(2025, 3, 11)), StreakChange::Extended);
        assert_eq!(s.record_activity(date(2025, 3, 12)), StreakChange::Extended);
        assert_eq!(s.current_streak(), 3);
        assert_eq!(s.longest_streak(), 3);
    }

    #[test]
    fn test_gap_with_banked_freeze_is_forgiven_and_counts_catch_up_day() {
        // Streak of 6 through Tuesday, one freeze banked.
        let mut s = Streak::restore(
            UserId::new(),
            6,
            6,
            date(2025, 3, 11),
            date(2025, 3, 6),
            false,
            1,
        );

        // Wednesday skipped entirely; Thursday activity arrives.
        let change = s.record_activity(date(2025, 3, 13));
        assert_eq!(change, StreakChange::Forgiven { freeze_consumed: true });
        assert_eq!(s.current_streak(), 7);
        assert_eq!(s.freezes_available(), 0);
        assert!(!s.is_frozen());
    }

    #[test]
    fn test_frozen_hold_resolves_without_spending_second_freeze() {
        // The sweep froze the record overnight: freeze already spent.
        let mut s = Streak::restore(
            UserId::new(),
            6,
            6,
            date(2025, 3, 11),
            date(2025, 3, 6),
            true,
            1,
        );

        let change = s.record_activity(date(2025, 3, 13));
        assert_eq!(change, StreakChange::Forgiven { freeze_consumed: false });
        assert_eq!(s.current_streak(), 7);
        // The banked freeze is untouched; the hold covered the gap.
        assert_eq!(s.freezes_available(), 1);
        assert!(!s.is_frozen());
        assert_eq!(s.state(), StreakState::Active);
    }

    #[test]
    fn test_unprotected_gap_restarts_and_keeps_high_water_mark() {
        let mut s = Streak::restore(
            UserId::new(),
            6,
            9,
            date(2025, 3, 11),
            date(2025, 3, 6),
            false,
            0,
        );

        // Wednesday and Thursday skipped, Friday activity.
        let change = s.record_activity(date(2025, 3, 14));
        assert_eq!(change, StreakChange::Restarted);
        assert_eq!(s.current_streak(), 1);
        assert_eq!(s.longest_streak(), 9);
        assert_eq!(s.streak_start_date(), date(2025, 3, 14));
    }

    #[test]
    fn test_activity_on_broken_record_starts_fresh() {
        let mut s = Streak::restore(
            UserId::new(),
            0,
            12,
            date(2025, 3, 1),
            date(2025, 2, 20),
            false,
            2,
        );

        let change = s.record_activity(date(2025, 3, 14));
        assert_eq!(change, StreakChange::Started);
        assert_eq!(s.current_streak(), 1);
        assert_eq!(s.longest_streak(), 12);
        // Starting fresh costs nothing; the banked freezes stay.
        assert_eq!(s.freezes_available(), 2);
    }

    #[test]
    fn test_banked_record_is_broken_until_first_activity() {
        let s = Streak::banked(UserId::new(), monday(), 3);
        assert_eq!(s.current_streak(), 0);
        assert_eq!(s.freezes_available(), 3);
        assert_eq!(s.state(), StreakState::Broken);
    }

    #[test]
    fn test_staleness_window() {
        let s = Streak::restore(
            UserId::new(),
            4,
            4,
            date(2025, 3, 10),
            date(2025, 3, 7),
            false,
            0,
        );

        // Active yesterday: not stale today.
        assert!(!s.is_stale(date(2025, 3, 11)));
        // One full missed day: stale.
        assert!(s.is_stale(date(2025, 3, 12)));
    }

    #[test]
    fn test_frozen_and_zero_records_are_not_stale() {
        let frozen = Streak::restore(
            UserId::new(),
            4,
            4,
            date(2025, 3, 1),
            date(2025, 2, 26),
            true,
            0,
        );
        assert!(!frozen.is_stale(date(2025, 3, 12)));

        let banked = Streak::banked(UserId::new(), date(2025, 3, 1), 2);
        assert!(!banked.is_stale(date(2025, 3, 12)));
    }

    #[test]
    fn test_freeze_missed_day_consumes_exactly_one() {
        let mut s = Streak::restore(
            UserId::new(),
            5,
            5,
            date(2025, 3, 9),
            date(2025, 3, 5),
            false,
            2,
        );

        assert!(s.freeze_missed_day());
        assert_eq!(s.freezes_available(), 1);
        assert!(s.is_frozen());
        assert_eq!(s.current_streak(), 5);

        // A second sweep pass must not spend another freeze.
        assert!(!s.freeze_missed_day());
        assert_eq!(s.freezes_available(), 1);
    }

    #[test]
    fn test_break_streak_preserves_longest() {
        let mut s = Streak::restore(
            UserId::new(),
            5,
            8,
            date(2025, 3, 9),
            date(2025, 3, 5),
            false,
            0,
        );

        s.break_streak();
        assert_eq!(s.current_streak(), 0);
        assert_eq!(s.longest_streak(), 8);
        assert_eq!(s.state(), StreakState::Broken);
    }

    #[test]
    fn test_longest_never_decreases_over_transitions() {
        let mut s = Streak::started(UserId::new(), monday());
        let mut days = vec![
            date(2025, 3, 11),
            date(2025, 3, 12),
            date(2025, 3, 15), // unprotected gap, restart
            date(2025, 3, 16),
            date(2025, 3, 16), // same-day repeat
        ];

        let mut high_water = s.longest_streak();
        for day in days.drain(..) {
            s.record_activity(day);
            assert!(s.longest_streak() >= s.current_streak());
            assert!(s.longest_streak() >= high_water);
            high_water = s.longest_streak();
        }
        assert_eq!(s.longest_streak(), 3);
        assert_eq!(s.current_streak(), 2);
    }
}
