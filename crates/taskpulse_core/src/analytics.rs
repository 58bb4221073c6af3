//! Aggregate productivity figures over the whole task list.

use crate::model::Task;
use crate::schedule::{SchedulePolicy, normalize_due_date, reference_date};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

const COMPLETION_WEIGHT: f64 = 50.0;
const HIGH_PRIORITY_WEIGHT: f64 = 30.0;
const ON_TIME_WEIGHT: f64 = 20.0;
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityStrength {
    Excellent,
    Good,
    Fair,
    NeedsWork,
}

impl ProductivityStrength {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::NeedsWork,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsWork => "Needs Work",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Outstanding task completion!",
            Self::Good => "Strong performance on high-priority tasks",
            Self::Fair => "Room for improvement",
            Self::NeedsWork => "Focus on completing tasks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub overdue: usize,
    /// Whole percent of finished tasks.
    pub completion_rate: u32,
    pub productivity_score: u32,
    pub strength: ProductivityStrength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayProgress {
    pub label: &'static str,
    pub date: Date,
    pub completed: usize,
    pub incomplete: usize,
}

pub fn task_stats(tasks: &[Task], now: OffsetDateTime, policy: &SchedulePolicy) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.is_complete()).count();
    let overdue = tasks
        .iter()
        .filter(|task| task.is_actionable())
        .filter(|task| {
            policy
                .due_instant(task.due_date.as_deref())
                .is_some_and(|due| due < now)
        })
        .count();
    let productivity_score = productivity_score(tasks, policy);

    TaskStats {
        total,
        completed,
        remaining: total - completed,
        overdue,
        completion_rate: percent(completed, total),
        productivity_score,
        strength: ProductivityStrength::from_score(productivity_score),
    }
}

/// Weighted score out of 100: completion share, finished high-priority work
/// and on-time completion. Missing categories score half their weight.
pub fn productivity_score(tasks: &[Task], policy: &SchedulePolicy) -> u32 {
    if tasks.is_empty() {
        return 0;
    }

    let total = tasks.len() as f64;
    let completed = tasks.iter().filter(|task| task.is_complete()).count() as f64;
    let completion = completed / total * COMPLETION_WEIGHT;

    let high: Vec<&Task> = tasks.iter().filter(|task| task.is_high_priority()).collect();
    let high_priority = if high.is_empty() {
        HIGH_PRIORITY_WEIGHT / 2.0
    } else {
        let done = high.iter().filter(|task| task.is_complete()).count() as f64;
        done / high.len() as f64 * HIGH_PRIORITY_WEIGHT
    };

    let mut with_due = 0usize;
    let mut on_time = 0usize;
    for task in tasks.iter().filter(|task| task.is_complete()) {
        let Some(due) = policy.due_instant(task.due_date.as_deref()) else {
            continue;
        };
        with_due += 1;
        let finished = task
            .updated_at
            .as_deref()
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());
        if finished.is_some_and(|finished| finished <= due) {
            on_time += 1;
        }
    }
    let punctuality = if with_due == 0 {
        ON_TIME_WEIGHT / 2.0
    } else {
        on_time as f64 / with_due as f64 * ON_TIME_WEIGHT
    };

    (completion + high_priority + punctuality).round() as u32
}

/// Monday-to-Sunday counts for the week containing `today`, bucketed by due
/// day in the reference timezone.
pub fn weekly_progress(tasks: &[Task], today: Date, reference: UtcOffset) -> Vec<DayProgress> {
    let monday = today
        .checked_sub(Duration::days(i64::from(
            today.weekday().number_days_from_monday(),
        )))
        .unwrap_or(Date::MIN);
    let due_days: Vec<(Date, bool)> = tasks
        .iter()
        .filter_map(|task| {
            let due = normalize_due_date(task.due_date.as_deref()?, reference)?;
            Some((reference_date(due, reference), task.is_complete()))
        })
        .collect();

    WEEKDAY_LABELS
        .into_iter()
        .enumerate()
        .filter_map(|(offset, label)| {
            let date = monday.checked_add(Duration::days(offset as i64))?;
            let (completed, incomplete) = due_days
                .iter()
                .filter(|(day, _)| *day == date)
                .fold((0, 0), |(done, open), (_, complete)| {
                    if *complete {
                        (done + 1, open)
                    } else {
                        (done, open + 1)
                    }
                });
            Some(DayProgress {
                label,
                date,
                completed,
                incomplete,
            })
        })
        .collect()
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}
