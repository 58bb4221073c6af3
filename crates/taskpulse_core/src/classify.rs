//! Buckets actionable tasks into overdue, due soon and upcoming relative to
//! "now".
//!
//! Two views exist. The day view keeps only tasks due on one calendar day and
//! places them by their start/end clock window. The global view keeps every
//! dated task and falls back to plain date comparison for tasks without a
//! start time.

use crate::model::Task;
use crate::schedule::{
    SchedulePolicy, day_shift_minutes, minutes_of_day, parse_clock, reference_date,
};
use serde::Serialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Overdue,
    DueSoon,
    Upcoming,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Overdue, Bucket::DueSoon, Bucket::Upcoming];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Overdue => "Overdue",
            Bucket::DueSoon => "Due soon",
            Bucket::Upcoming => "Upcoming",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    /// Only tasks due on this calendar day (reference timezone).
    Day(Date),
    /// Every dated task.
    All,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Buckets<'a> {
    pub overdue: Vec<&'a Task>,
    pub due_soon: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
}

impl<'a> Buckets<'a> {
    pub fn get(&self, bucket: Bucket) -> &[&'a Task] {
        match bucket {
            Bucket::Overdue => &self.overdue,
            Bucket::DueSoon => &self.due_soon,
            Bucket::Upcoming => &self.upcoming,
        }
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.due_soon.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<&'a Task> {
        match bucket {
            Bucket::Overdue => &mut self.overdue,
            Bucket::DueSoon => &mut self.due_soon,
            Bucket::Upcoming => &mut self.upcoming,
        }
    }
}

/// Ordering groups inside a bucket, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Ongoing,
    NotStarted,
    Ended,
    Untimed,
    Undated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    bucket: Bucket,
    phase: Phase,
    /// Minutes relative to now that order tasks within a phase.
    minutes: i64,
}

impl Placement {
    fn sort_key(&self) -> (Phase, i64) {
        (self.phase, self.minutes)
    }
}

/// Day view. `reference_date` defaults to today in the reference timezone.
pub fn classify<'a>(
    tasks: &'a [Task],
    now: OffsetDateTime,
    reference_date: Option<Date>,
    policy: &SchedulePolicy,
) -> Buckets<'a> {
    let day = reference_date.unwrap_or_else(|| policy.today(now));
    collect(tasks, now, ViewScope::Day(day), policy)
}

/// Global view across all days.
pub fn classify_all<'a>(
    tasks: &'a [Task],
    now: OffsetDateTime,
    policy: &SchedulePolicy,
) -> Buckets<'a> {
    collect(tasks, now, ViewScope::All, policy)
}

/// Bucket of a single task, `None` when it is complete, undated or outside
/// the scope.
pub fn bucket_of(
    task: &Task,
    now: OffsetDateTime,
    scope: ViewScope,
    policy: &SchedulePolicy,
) -> Option<Bucket> {
    if !task.is_actionable() {
        return None;
    }
    place(task, now, scope, policy).map(|placement| placement.bucket)
}

/// Full list ordering: dated tasks by urgency, undated after them and
/// finished tasks always last.
pub fn sort_for_list<'a>(
    tasks: &'a [Task],
    now: OffsetDateTime,
    policy: &SchedulePolicy,
) -> Vec<&'a Task> {
    let mut keyed: Vec<_> = tasks
        .iter()
        .map(|task| {
            let (phase, minutes) = place(task, now, ViewScope::All, policy)
                .map(|placement| placement.sort_key())
                .unwrap_or((Phase::Undated, 0));
            ((task.is_complete(), phase, minutes), task)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, task)| task).collect()
}

fn collect<'a>(
    tasks: &'a [Task],
    now: OffsetDateTime,
    scope: ViewScope,
    policy: &SchedulePolicy,
) -> Buckets<'a> {
    let mut placed: Vec<(Placement, &'a Task)> = tasks
        .iter()
        .filter(|task| task.is_actionable())
        .filter_map(|task| place(task, now, scope, policy).map(|placement| (placement, task)))
        .collect();
    placed.sort_by_key(|(placement, _)| placement.sort_key());

    let mut buckets = Buckets::default();
    for (placement, task) in placed {
        buckets.get_mut(placement.bucket).push(task);
    }
    buckets
}

fn place(
    task: &Task,
    now: OffsetDateTime,
    scope: ViewScope,
    policy: &SchedulePolicy,
) -> Option<Placement> {
    let due = policy.due_instant(task.due_date.as_deref())?;
    let due_day = reference_date(due, policy.reference_offset);
    if let ViewScope::Day(day) = scope
        && due_day != day
    {
        return None;
    }

    let local_now = now.to_offset(policy.reference_offset);
    let today = local_now.date();
    // Clock position expressed on the due day, so earlier days are fully
    // elapsed and later days are fully ahead.
    let current = minutes_of_day(local_now.time()) - day_shift_minutes(today, due_day);
    let until_due = (due - now).whole_minutes();

    if let Some(start) = task.start_time.as_deref().and_then(parse_clock) {
        let end = task.end_time.as_deref().and_then(parse_clock);
        return Some(place_window(
            start - current,
            end.map(|end| end - current),
            policy.due_soon_window.whole_minutes(),
        ));
    }

    let placement = match scope {
        ViewScope::Day(_) => Placement {
            bucket: Bucket::DueSoon,
            phase: Phase::Untimed,
            minutes: until_due,
        },
        ViewScope::All => {
            let bucket = if due_day < today {
                Bucket::Overdue
            } else if due - now <= policy.due_soon_horizon {
                Bucket::DueSoon
            } else {
                Bucket::Upcoming
            };
            Placement {
                bucket,
                phase: Phase::Untimed,
                minutes: until_due,
            }
        }
    };
    Some(placement)
}

/// `start` and `end` are minutes from now. A window without an end stays
/// ongoing once it has started.
fn place_window(start: i64, end: Option<i64>, due_soon_window: i64) -> Placement {
    let ongoing = start <= 0 && end.is_none_or(|end| end >= 0);
    if ongoing {
        return Placement {
            bucket: Bucket::DueSoon,
            phase: Phase::Ongoing,
            minutes: end.unwrap_or(i64::MAX),
        };
    }

    if start > 0 {
        let bucket = if start <= due_soon_window {
            Bucket::DueSoon
        } else {
            Bucket::Upcoming
        };
        return Placement {
            bucket,
            phase: Phase::NotStarted,
            minutes: start,
        };
    }

    Placement {
        bucket: Bucket::Overdue,
        phase: Phase::Ended,
        minutes: end.unwrap_or(start),
    }
}
