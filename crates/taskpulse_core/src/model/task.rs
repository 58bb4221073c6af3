use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<String>,
    #[serde(default, alias = "endTime")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

impl Task {
    /// Share of completed subtasks, rounded to a whole percent. A task
    /// without subtasks is at 0.
    pub fn completion_percent(&self) -> u8 {
        let total = self.subtasks.len();
        if total == 0 {
            return 0;
        }
        let done = self.subtasks.iter().filter(|subtask| subtask.completed).count();
        ((done as f64 / total as f64) * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completion_percent() == 100
    }

    /// Only actionable tasks are classified or reminded about.
    pub fn is_actionable(&self) -> bool {
        !self.is_complete()
    }

    pub fn is_high_priority(&self) -> bool {
        matches!(self.priority, TaskPriority::High | TaskPriority::Urgent)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Work,
    Personal,
    Shopping,
    Health,
    Finance,
    Education,
    Other,
}
