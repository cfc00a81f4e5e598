//! Dashboard Summary
//!
//! Counts and the most recent tasks, computed from freshly fetched stores.

use crate::error::ApiResult;
use crate::models::{Reminder, Task};
use crate::store::{ReminderStore, TaskStore};

/// How many tasks the dashboard lists
pub const RECENT_TASKS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub task_count: usize,
    pub reminder_count: usize,
    /// Last tasks in server order, newest first
    pub recent_tasks: Vec<Task>,
}

impl DashboardSummary {
    pub fn from_collections(tasks: &[Task], reminders: &[Reminder]) -> Self {
        Self {
            task_count: tasks.len(),
            reminder_count: reminders.len(),
            recent_tasks: tasks.iter().rev().take(RECENT_TASKS).cloned().collect(),
        }
    }
}

/// Refresh both collections concurrently and summarize them.
pub async fn load(tasks: &TaskStore, reminders: &ReminderStore) -> ApiResult<DashboardSummary> {
    let (loaded_tasks, loaded_reminders) = futures::join!(tasks.fetch_all(), reminders.fetch_all());
    loaded_tasks?;
    loaded_reminders?;
    Ok(DashboardSummary::from_collections(&tasks.snapshot(), &reminders.snapshot()))
}
