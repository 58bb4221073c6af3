use crate::error::AppError;
use crate::model::Task;
use crate::notifier::{
    NotificationRecord, NotificationState, TaskFeed, TickOutcome, evaluate_tick, on_logout,
};
use crate::notify::{Notifier, notifier_from_env};
use crate::schedule::SchedulePolicy;
use crate::storage::json_store;
use crate::storage::state_store::{self, StatePaths};
use log::{debug, warn};
use std::path::Path;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub failures: Vec<NotificationFailure>,
    /// Problem reading or writing the notification state. The tick still ran.
    pub state_error: Option<AppError>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub record_id: String,
    pub error: AppError,
}

pub fn load_snapshot() -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    json_store::load_tasks(&path)
}

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    tasks
        .iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))
}

pub fn run_tick(now: OffsetDateTime, policy: &SchedulePolicy) -> Result<TickReport, AppError> {
    let store = json_store::store_path()?;
    let paths = StatePaths::from_env()?;
    let notifier = notifier_from_env()?;
    run_tick_with_paths(&store, &paths, now, policy, notifier.as_ref())
}

pub fn logout() -> Result<NotificationState, AppError> {
    let paths = StatePaths::from_env()?;
    logout_with_paths(&paths)
}

fn run_tick_with_paths(
    store: &Path,
    paths: &StatePaths,
    now: OffsetDateTime,
    policy: &SchedulePolicy,
    notifier: &dyn Notifier,
) -> Result<TickReport, AppError> {
    let tasks = json_store::load_tasks(store)?;
    let loaded = state_store::load_state_with_fallback(paths);
    let outcome = evaluate_tick(TaskFeed::Ready(&tasks), now, &loaded.state, policy);
    let mut state_error = loaded.error;

    if outcome.next_state != loaded.state {
        if let Err(err) = state_store::save_state(paths, &outcome.next_state) {
            warn!("failed to persist notification state: {err}");
            state_error = Some(err);
        }
    } else {
        debug!("notification state unchanged");
    }

    let failures = deliver(&outcome.emissions, notifier);
    Ok(TickReport {
        outcome,
        failures,
        state_error,
    })
}

fn deliver(records: &[NotificationRecord], notifier: &dyn Notifier) -> Vec<NotificationFailure> {
    let mut failures = Vec::new();
    for record in records {
        if let Err(err) = notifier.notify(record) {
            warn!("notification {} failed: {err}", record.id);
            failures.push(NotificationFailure {
                record_id: record.id.clone(),
                error: err,
            });
        }
    }
    failures
}

fn logout_with_paths(paths: &StatePaths) -> Result<NotificationState, AppError> {
    state_store::clear_state(paths)?;
    Ok(on_logout())
}
