pub mod analytics;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod notifier;
pub mod notify;
pub mod schedule;
pub mod storage;
pub mod watch_api;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Task, TaskPriority, TaskStatus};

    #[test]
    fn task_defaults_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"task-1","title":"demo"}"#).unwrap();

        assert_eq!(task.id, "task-1");
        assert_eq!(task.title, "demo");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.due_date, None);
        assert_eq!(task.start_time, None);
        assert!(task.subtasks.is_empty());
        assert!(task.is_actionable());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
    }
}
