//! Tasks that sessions can be attributed to.
//!
//! Sessions hold a task id, never the task itself; deleting a task leaves
//! its sessions in place with a dangling id.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::methodology::parse_tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Day this task is the highlight for. Uniqueness per day is up to the
    /// caller.
    pub highlight_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            highlight_date: None,
        }
    }

    /// Create a task from free-form input such as `"Write report #writing"`.
    pub fn from_input(input: &str, now: DateTime<Utc>) -> Self {
        let (title, tags) = parse_tags(input);
        let mut task = Self::new(title, now);
        task.tags = tags;
        task
    }

    /// Mark as being worked on. A finished task picked up again is reopened.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::InProgress;
        self.completed_at = None;
        self.updated_at = now;
    }

    pub fn is_highlight_for(&self, date: NaiveDate) -> bool {
        self.highlight_date == Some(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_extracts_tags() {
        let task = Task::from_input("Review PR #review #team", Utc::now());
        assert_eq!(task.title, "Review PR");
        assert_eq!(task.tags, vec!["review", "team"]);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn start_reopens_and_touches() {
        let created = Utc::now();
        let mut task = Task::new("Write", created);
        task.status = TaskStatus::Completed;
        task.completed_at = Some(created);

        let later = created + chrono::Duration::minutes(5);
        task.start(later);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());
        assert_eq!(task.updated_at, later);
    }
}
