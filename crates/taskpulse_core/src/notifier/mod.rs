//! Overdue reminder step function.
//!
//! The caller owns persistence and display: every tick takes the current
//! [`NotificationState`] by reference and returns the next one together with
//! the records to show. The first tick of a login session emits one batch
//! covering overdue, due-soon and upcoming tasks; later ticks rotate through
//! overdue tasks one at a time, at most once per cooldown.

mod display;

pub use display::DisplayQueue;

use crate::model::Task;
use crate::schedule::{SchedulePolicy, unix_millis};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    /// Epoch milliseconds of the last emission.
    #[serde(default)]
    pub last_notification_ms: Option<i64>,
    #[serde(default)]
    pub overdue_rotation_index: usize,
    #[serde(default)]
    pub session_notifications_shown: bool,
}

impl NotificationState {
    pub fn phase(&self) -> NotifierPhase {
        if self.last_notification_ms.is_none() && !self.session_notifications_shown {
            NotifierPhase::FirstLoginBurst
        } else {
            NotifierPhase::SteadyState
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierPhase {
    FirstLoginBurst,
    SteadyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Overdue,
    DueSoon,
    UpcomingDeadline,
}

impl ReminderKind {
    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::Overdue => "Overdue Task",
            ReminderKind::DueSoon => "Due Soon",
            ReminderKind::UpcomingDeadline => "Upcoming Deadline",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ReminderKind::Overdue => Severity::Danger,
            ReminderKind::DueSoon | ReminderKind::UpcomingDeadline => Severity::Warning,
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ReminderKind::Overdue => "overdue",
            ReminderKind::DueSoon => "due-soon",
            ReminderKind::UpcomingDeadline => "upcoming",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRecord {
    pub id: String,
    pub task_id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl NotificationRecord {
    fn new(kind: ReminderKind, task: &Task, message: String, now_ms: i64) -> Self {
        Self {
            id: format!("{}-{}-{}", kind.slug(), task.id, now_ms),
            task_id: task.id.clone(),
            kind,
            title: kind.title().to_string(),
            message,
            severity: kind.severity(),
        }
    }
}

/// Task list as seen by the notifier.
#[derive(Debug, Clone, Copy)]
pub enum TaskFeed<'a> {
    Loading,
    Ready(&'a [Task]),
}

/// What the display sink should do with its current records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayAction {
    Keep,
    Replace,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub emissions: Vec<NotificationRecord>,
    pub next_state: NotificationState,
    pub display: DisplayAction,
}

impl TickOutcome {
    fn unchanged(state: &NotificationState, display: DisplayAction) -> Self {
        Self {
            emissions: Vec::new(),
            next_state: state.clone(),
            display,
        }
    }
}

/// State a fresh login starts from.
pub fn on_logout() -> NotificationState {
    info!("notification state reset");
    NotificationState::default()
}

pub fn evaluate_tick(
    feed: TaskFeed<'_>,
    now: OffsetDateTime,
    state: &NotificationState,
    policy: &SchedulePolicy,
) -> TickOutcome {
    let tasks = match feed {
        TaskFeed::Ready(tasks) if !tasks.is_empty() => tasks,
        _ => {
            debug!("tick skipped: task list not ready");
            return TickOutcome::unchanged(state, DisplayAction::Keep);
        }
    };

    match state.phase() {
        NotifierPhase::FirstLoginBurst => first_login_burst(tasks, now, policy),
        NotifierPhase::SteadyState => rotate_overdue(tasks, now, state, policy),
    }
}

fn first_login_burst(tasks: &[Task], now: OffsetDateTime, policy: &SchedulePolicy) -> TickOutcome {
    let now_ms = unix_millis(now);
    let due_soon_ms = policy.due_soon_horizon.whole_milliseconds();
    let upcoming_ms = policy.upcoming_horizon.whole_milliseconds();
    let mut seen = HashSet::new();
    let mut emissions = Vec::new();

    for task in tasks.iter().filter(|task| task.is_actionable()) {
        let Some(due) = policy.due_instant(task.due_date.as_deref()) else {
            continue;
        };
        if !seen.insert(task.id.as_str()) {
            continue;
        }

        let diff_ms = (due - now).whole_milliseconds();
        let record = if diff_ms < 0 {
            NotificationRecord::new(ReminderKind::Overdue, task, overdue_message(task), now_ms)
        } else if diff_ms > 0 && diff_ms <= due_soon_ms {
            let hours = (diff_ms as f64 / MILLIS_PER_HOUR).round() as i64;
            let message = format!("\"{}\" is due in {}", task.title, plural(hours, "hour"));
            NotificationRecord::new(ReminderKind::DueSoon, task, message, now_ms)
        } else if diff_ms > due_soon_ms && diff_ms <= upcoming_ms {
            let days = (diff_ms as f64 / MILLIS_PER_DAY).ceil() as i64;
            let message = format!("\"{}\" is due in {}", task.title, plural(days, "day"));
            NotificationRecord::new(ReminderKind::UpcomingDeadline, task, message, now_ms)
        } else {
            continue;
        };
        emissions.push(record);
    }

    info!("first login burst: {} notification(s)", emissions.len());
    TickOutcome {
        emissions,
        next_state: NotificationState {
            last_notification_ms: Some(now_ms),
            overdue_rotation_index: 0,
            session_notifications_shown: true,
        },
        display: DisplayAction::Replace,
    }
}

fn rotate_overdue(
    tasks: &[Task],
    now: OffsetDateTime,
    state: &NotificationState,
    policy: &SchedulePolicy,
) -> TickOutcome {
    let overdue = overdue_tasks(tasks, now, policy);
    if overdue.is_empty() {
        debug!("no overdue tasks, clearing reminders");
        return TickOutcome::unchanged(state, DisplayAction::Clear);
    }

    let now_ms = unix_millis(now);
    let elapsed_ms = i128::from(now_ms) - i128::from(state.last_notification_ms.unwrap_or(0));
    if elapsed_ms < policy.reminder_cooldown.whole_milliseconds() {
        debug!("reminder cooldown active ({elapsed_ms} ms since last)");
        return TickOutcome::unchanged(state, DisplayAction::Keep);
    }

    let index = state.overdue_rotation_index % overdue.len();
    let task = overdue[index];
    info!("overdue reminder for task {}", task.id);

    TickOutcome {
        emissions: vec![NotificationRecord::new(
            ReminderKind::Overdue,
            task,
            overdue_message(task),
            now_ms,
        )],
        next_state: NotificationState {
            last_notification_ms: Some(now_ms),
            overdue_rotation_index: (index + 1) % overdue.len(),
            session_notifications_shown: state.session_notifications_shown,
        },
        display: DisplayAction::Replace,
    }
}

/// Actionable tasks whose due instant has passed, first occurrence of each id
/// in input order.
pub fn overdue_tasks<'a>(
    tasks: &'a [Task],
    now: OffsetDateTime,
    policy: &SchedulePolicy,
) -> Vec<&'a Task> {
    let mut seen = HashSet::new();
    let mut overdue = Vec::new();
    for task in tasks.iter().filter(|task| task.is_actionable()) {
        let late = policy
            .due_instant(task.due_date.as_deref())
            .is_some_and(|due| due < now);
        if late && seen.insert(task.id.as_str()) {
            overdue.push(task);
        }
    }
    overdue
}

fn overdue_message(task: &Task) -> String {
    format!("\"{}\" is overdue!", task.title)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DisplayAction, NotificationState, NotifierPhase, ReminderKind, Severity, TaskFeed,
        evaluate_tick, on_logout, overdue_tasks,
    };
    use crate::model::{Subtask, Task};
    use crate::schedule::{SchedulePolicy, unix_millis};
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    const NOW: OffsetDateTime = datetime!(2024-05-01 09:00 +8);

    fn task(id: &str, due: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status: Default::default(),
            priority: Default::default(),
            category: None,
            due_date: Some(due.to_string()),
            start_time: None,
            end_time: None,
            subtasks: Vec::new(),
            updated_at: None,
        }
    }

    fn due_in(id: &str, offset: Duration) -> Task {
        let due = (NOW + offset)
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();
        task(id, &due)
    }

    fn steady_state(last: OffsetDateTime) -> NotificationState {
        NotificationState {
            last_notification_ms: Some(unix_millis(last)),
            overdue_rotation_index: 0,
            session_notifications_shown: true,
        }
    }

    #[test]
    fn fresh_login_emits_one_batch() {
        let tasks = vec![
            due_in("late", -Duration::days(2)),
            due_in("soon", Duration::hours(18)),
            due_in("later", Duration::days(2)),
            due_in("far", Duration::days(5)),
        ];
        let policy = SchedulePolicy::default();
        let state = NotificationState::default();
        assert_eq!(state.phase(), NotifierPhase::FirstLoginBurst);

        let outcome = evaluate_tick(TaskFeed::Ready(&tasks), NOW, &state, &policy);

        let kinds: Vec<_> = outcome.emissions.iter().map(|record| record.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReminderKind::Overdue,
                ReminderKind::DueSoon,
                ReminderKind::UpcomingDeadline
            ]
        );
        assert_eq!(outcome.emissions[0].title, "Overdue Task");
        assert_eq!(outcome.emissions[0].severity, Severity::Danger);
        assert_eq!(outcome.emissions[0].message, "\"task late\" is overdue!");
        assert_eq!(outcome.emissions[1].message, "\"task soon\" is due in 18 hours");
        assert_eq!(outcome.emissions[1].severity, Severity::Warning);
        assert_eq!(outcome.emissions[2].message, "\"task later\" is due in 2 days");
        assert_eq!(outcome.display, DisplayAction::Replace);
        assert_eq!(
            outcome.next_state,
            NotificationState {
                last_notification_ms: Some(unix_millis(NOW)),
                overdue_rotation_index: 0,
                session_notifications_shown: true,
            }
        );
        assert_eq!(outcome.next_state.phase(), NotifierPhase::SteadyState);
    }

    #[test]
    fn burst_window_boundaries() {
        let tasks = vec![
            due_in("one-hour", Duration::hours(1)),
            due_in("day-edge", Duration::hours(24)),
            due_in("just-past-day", Duration::hours(24) + Duration::minutes(1)),
            due_in("three-days", Duration::days(3)),
            due_in("past-three-days", Duration::days(3) + Duration::minutes(1)),
            due_in("right-now", Duration::ZERO),
        ];

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &NotificationState::default(),
            &SchedulePolicy::default(),
        );

        let summary: Vec<_> = outcome
            .emissions
            .iter()
            .map(|record| (record.task_id.as_str(), record.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("one-hour", ReminderKind::DueSoon),
                ("day-edge", ReminderKind::DueSoon),
                ("just-past-day", ReminderKind::UpcomingDeadline),
                ("three-days", ReminderKind::UpcomingDeadline),
            ]
        );
        assert_eq!(outcome.emissions[0].message, "\"task one-hour\" is due in 1 hour");
        assert_eq!(outcome.emissions[2].message, "\"task just-past-day\" is due in 2 days");
    }

    #[test]
    fn burst_skips_finished_undated_and_duplicates() {
        let mut done = due_in("done", -Duration::days(1));
        done.subtasks = vec![Subtask {
            title: "all".to_string(),
            completed: true,
        }];
        let mut undated = due_in("undated", -Duration::days(1));
        undated.due_date = None;
        let tasks = vec![
            done,
            undated,
            due_in("twice", -Duration::hours(3)),
            due_in("twice", -Duration::hours(3)),
        ];

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &NotificationState::default(),
            &SchedulePolicy::default(),
        );

        assert_eq!(outcome.emissions.len(), 1);
        assert_eq!(outcome.emissions[0].task_id, "twice");
    }

    #[test]
    fn loading_or_empty_feed_is_a_no_op() {
        let policy = SchedulePolicy::default();
        let state = NotificationState::default();

        let loading = evaluate_tick(TaskFeed::Loading, NOW, &state, &policy);
        let empty = evaluate_tick(TaskFeed::Ready(&[]), NOW, &state, &policy);

        for outcome in [loading, empty] {
            assert!(outcome.emissions.is_empty());
            assert_eq!(outcome.next_state, state);
            assert_eq!(outcome.display, DisplayAction::Keep);
        }
    }

    #[test]
    fn cooldown_blocks_reminders_under_three_minutes() {
        let tasks = vec![due_in("late", -Duration::hours(2))];
        let policy = SchedulePolicy::default();
        let state = steady_state(NOW);

        let early = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW + Duration::seconds(61),
            &state,
            &policy,
        );
        assert!(early.emissions.is_empty());
        assert_eq!(early.display, DisplayAction::Keep);
        assert_eq!(early.next_state, state);

        let later = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW + Duration::minutes(3),
            &state,
            &policy,
        );
        assert_eq!(later.emissions.len(), 1);
        assert_eq!(later.emissions[0].kind, ReminderKind::Overdue);
        assert_eq!(
            later.next_state.last_notification_ms,
            Some(unix_millis(NOW + Duration::minutes(3)))
        );
    }

    #[test]
    fn rotation_cycles_through_overdue_tasks() {
        let tasks = vec![
            due_in("a", -Duration::hours(1)),
            due_in("future", Duration::hours(5)),
            due_in("b", -Duration::hours(2)),
            due_in("c", -Duration::days(1)),
        ];
        let policy = SchedulePolicy::default();
        let mut state = steady_state(NOW - Duration::hours(1));
        let mut now = NOW;
        let mut notified = Vec::new();

        for _ in 0..7 {
            let outcome = evaluate_tick(TaskFeed::Ready(&tasks), now, &state, &policy);
            assert_eq!(outcome.emissions.len(), 1);
            notified.push(outcome.emissions[0].task_id.clone());
            state = outcome.next_state;
            now += Duration::minutes(3);
        }

        assert_eq!(notified, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn rotation_index_wraps_when_the_list_shrinks() {
        let tasks = vec![due_in("a", -Duration::hours(1)), due_in("b", -Duration::hours(1))];
        let mut state = steady_state(NOW - Duration::hours(1));
        state.overdue_rotation_index = 5;

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &state,
            &SchedulePolicy::default(),
        );

        assert_eq!(outcome.emissions[0].task_id, "b");
        assert_eq!(outcome.next_state.overdue_rotation_index, 0);
    }

    #[test]
    fn extreme_stored_cursor_and_timestamp_are_tolerated() {
        let tasks = vec![due_in("a", -Duration::hours(1)), due_in("b", -Duration::hours(1))];
        let state = NotificationState {
            last_notification_ms: Some(i64::MIN),
            overdue_rotation_index: usize::MAX,
            session_notifications_shown: true,
        };

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &state,
            &SchedulePolicy::default(),
        );

        let expected = usize::MAX % 2;
        assert_eq!(outcome.emissions.len(), 1);
        assert_eq!(outcome.emissions[0].task_id, tasks[expected].id);
        assert_eq!(outcome.next_state.overdue_rotation_index, (expected + 1) % 2);
        assert_eq!(outcome.next_state.last_notification_ms, Some(unix_millis(NOW)));
    }

    #[test]
    fn timestamp_from_the_future_keeps_cooldown_active() {
        let tasks = vec![due_in("a", -Duration::hours(1))];
        let state = NotificationState {
            last_notification_ms: Some(i64::MAX),
            overdue_rotation_index: 0,
            session_notifications_shown: true,
        };

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &state,
            &SchedulePolicy::default(),
        );
        assert!(outcome.emissions.is_empty());
        assert_eq!(outcome.display, DisplayAction::Keep);
    }

    #[test]
    fn overdue_list_skips_due_dates_beyond_the_calendar() {
        let tasks = vec![
            task("edge", "9999-12-31T20:00:00Z"),
            due_in("late", -Duration::hours(1)),
        ];
        let overdue = overdue_tasks(&tasks, NOW, &SchedulePolicy::default());
        let ids: Vec<&str> = overdue.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["late"]);
    }

    #[test]
    fn no_overdue_tasks_clears_display() {
        let tasks = vec![due_in("future", Duration::hours(5))];
        let state = steady_state(NOW - Duration::hours(1));

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &state,
            &SchedulePolicy::default(),
        );

        assert!(outcome.emissions.is_empty());
        assert_eq!(outcome.display, DisplayAction::Clear);
        assert_eq!(outcome.next_state, state);
    }

    #[test]
    fn session_flag_alone_keeps_steady_state() {
        let tasks = vec![due_in("late", -Duration::hours(1))];
        let state = NotificationState {
            last_notification_ms: None,
            overdue_rotation_index: 0,
            session_notifications_shown: true,
        };
        assert_eq!(state.phase(), NotifierPhase::SteadyState);

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW,
            &state,
            &SchedulePolicy::default(),
        );
        assert_eq!(outcome.emissions.len(), 1);
        assert_eq!(outcome.emissions[0].kind, ReminderKind::Overdue);
    }

    #[test]
    fn logout_returns_to_first_login_burst() {
        let state = on_logout();
        assert_eq!(state, NotificationState::default());
        assert_eq!(state.phase(), NotifierPhase::FirstLoginBurst);
    }

    #[test]
    fn shorter_cooldown_from_policy_is_honoured() {
        let tasks = vec![due_in("late", -Duration::hours(1))];
        let policy = SchedulePolicy {
            reminder_cooldown: Duration::seconds(30),
            ..SchedulePolicy::default()
        };

        let outcome = evaluate_tick(
            TaskFeed::Ready(&tasks),
            NOW + Duration::seconds(45),
            &steady_state(NOW),
            &policy,
        );
        assert_eq!(outcome.emissions.len(), 1);
    }
}
