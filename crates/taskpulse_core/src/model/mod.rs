mod task;

pub use task::{Subtask, Task, TaskCategory, TaskPriority, TaskStatus};
