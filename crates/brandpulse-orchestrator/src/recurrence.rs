//! Recurrence calculator — computes the next due time for a configuration.
//!
//! Pure chrono arithmetic: no clock access beyond the `now` argument, no
//! I/O. The caller (the engine) passes the pass timestamp so the whole run
//! advances schedules against one consistent "now".

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};

use crate::model::Frequency;

/// Compute the next run strictly after `now`.
///
/// With an anchor, the candidate starts at `now`'s date with the anchor's
/// hour/minute; the frequency offset is added on top. A candidate that
/// lands at or before `now` (anchor already elapsed this period) is pushed
/// out one extra day so the configuration cannot requeue immediately.
pub fn compute_next_run(
    frequency: Frequency,
    schedule_time: Option<NaiveTime>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let candidate = match schedule_time {
        Some(anchor) => now.date_naive().and_time(anchor).and_utc(),
        None => now,
    };

    let next = match frequency {
        Frequency::Hourly => candidate + Duration::hours(1),
        Frequency::Daily => candidate + Duration::days(1),
        Frequency::Weekly => candidate + Duration::days(7),
        Frequency::Monthly => candidate
            .checked_add_months(Months::new(1))
            .unwrap_or(candidate + Duration::days(30)),
    };

    if next <= now {
        next + Duration::days(1)
    } else {
        next
    }
}
