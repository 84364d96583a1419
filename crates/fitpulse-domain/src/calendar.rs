//! Day-boundary arithmetic shared by the streak engine and the daily sweeps.
//!
//! All comparisons are on calendar days in a single canonical timezone (UTC);
//! callers normalize timestamps before handing them to the engine. A "day" is
//! never a rolling 24h window.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Calendar day a timestamp falls on.
pub fn day_of(t: DateTime<Utc>) -> NaiveDate {
    t.date_naive()
}

/// Midnight at the start of the timestamp's day.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

/// True when `reference` is exactly the day before `today`.
pub fn is_yesterday(reference: NaiveDate, today: NaiveDate) -> bool {
    days_between(reference, today) == 1
}

/// Signed number of whole days from `earlier` to `later`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}
