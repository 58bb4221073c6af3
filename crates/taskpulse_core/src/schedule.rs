//! Date and clock normalization shared by the classifier, the notifier and
//! analytics.
//!
//! Every comparison happens in a fixed reference offset (the product's
//! operating timezone) rather than the viewer's local offset. Date-only due
//! dates are anchored at local noon so that shifting them by up to twelve
//! hours never moves them to a neighbouring calendar day.

use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, offset, time};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Asia/Kuala_Lumpur, which observes no daylight saving.
pub const DEFAULT_REFERENCE_OFFSET: UtcOffset = offset!(+8);
pub const DEFAULT_DUE_SOON_WINDOW_MINUTES: i64 = 120;
pub const DEFAULT_REMINDER_COOLDOWN_SECONDS: i64 = 180;

const ANCHOR_TIME: Time = time!(12:00);
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Thresholds the classifier and notifier work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub reference_offset: UtcOffset,
    /// A windowed task starting within this span counts as due soon.
    pub due_soon_window: Duration,
    /// Minimum gap between two rotating overdue reminders.
    pub reminder_cooldown: Duration,
    /// Upper bound of the "Due Soon" reminder on first login.
    pub due_soon_horizon: Duration,
    /// Upper bound of the "Upcoming Deadline" reminder on first login.
    pub upcoming_horizon: Duration,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            reference_offset: DEFAULT_REFERENCE_OFFSET,
            due_soon_window: Duration::minutes(DEFAULT_DUE_SOON_WINDOW_MINUTES),
            reminder_cooldown: Duration::seconds(DEFAULT_REMINDER_COOLDOWN_SECONDS),
            due_soon_horizon: Duration::hours(24),
            upcoming_horizon: Duration::days(3),
        }
    }
}

impl SchedulePolicy {
    pub fn today(&self, now: OffsetDateTime) -> Date {
        reference_date(now, self.reference_offset)
    }

    pub fn due_instant(&self, raw: Option<&str>) -> Option<OffsetDateTime> {
        raw.and_then(|value| normalize_due_date(value, self.reference_offset))
    }

    /// `None` when `instant` cannot be expressed in the reference offset.
    pub fn check_instant(&self, instant: OffsetDateTime) -> Option<OffsetDateTime> {
        within_range(instant, self.reference_offset)
    }
}

/// Turns a stored due date into a concrete instant.
///
/// Accepts `2024-05-01`, `2024-05-01T00:00:00` (treated like the bare date),
/// RFC 3339 instants and naive date-times, which are read in `reference`.
/// Anything else yields `None` and the task is treated as having no due date.
pub fn normalize_due_date(raw: &str, reference: UtcOffset) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some((date_part, time_part)) = trimmed.split_once(['T', 't', ' ']) else {
        return parse_date(trimmed).and_then(|date| anchor_at_noon(date, reference));
    };

    if let Ok(instant) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        if instant.time() == Time::MIDNIGHT {
            return anchor_at_noon(instant.date(), reference);
        }
        return within_range(instant, reference);
    }

    let date = parse_date(date_part)?;
    let clock = parse_naive_time(time_part)?;
    if clock == Time::MIDNIGHT {
        return anchor_at_noon(date, reference);
    }
    within_range(PrimitiveDateTime::new(date, clock).assume_offset(reference), reference)
}

/// Minutes since midnight for an `HH:MM` (or `HH:MM:SS`) clock value.
pub fn parse_clock(raw: &str) -> Option<i64> {
    let clock = Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw.trim(), format_description!("[hour]:[minute]:[second]")))
        .ok()?;
    Some(minutes_of_day(clock))
}

/// `instant` must be expressible in `reference`; see
/// [`SchedulePolicy::check_instant`].
pub fn reference_date(instant: OffsetDateTime, reference: UtcOffset) -> Date {
    instant.to_offset(reference).date()
}

pub fn minutes_of_day(clock: Time) -> i64 {
    i64::from(clock.hour()) * 60 + i64::from(clock.minute())
}

/// Whole days between two calendar dates expressed in minutes.
pub(crate) fn day_shift_minutes(from: Date, to: Date) -> i64 {
    (to - from).whole_days() * MINUTES_PER_DAY
}

pub(crate) fn unix_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

fn anchor_at_noon(date: Date, reference: UtcOffset) -> Option<OffsetDateTime> {
    within_range(
        PrimitiveDateTime::new(date, ANCHOR_TIME).assume_offset(reference),
        reference,
    )
}

/// Instants at the edge of the supported years may not survive a change of
/// offset; those are rejected.
fn within_range(instant: OffsetDateTime, reference: UtcOffset) -> Option<OffsetDateTime> {
    instant.checked_to_offset(UtcOffset::UTC)?;
    instant.checked_to_offset(reference)?;
    Some(instant)
}

fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_naive_time(raw: &str) -> Option<Time> {
    Time::parse(raw, format_description!("[hour]:[minute]:[second].[subsecond]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]:[second]")))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]")))
        .ok()
}
