//! Daily highlight carry-forward.

use serde::Serialize;

use crate::task::{Task, TaskStatus};

/// The highlight to offer for today.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "task", rename_all = "snake_case")]
pub enum HighlightCandidate {
    /// A highlight is already set for today.
    Today(Task),
    /// Yesterday's unfinished highlight, offered again. The caller decides
    /// whether to adopt it.
    CarriedOver(Task),
}

impl HighlightCandidate {
    pub fn task(&self) -> &Task {
        match self {
            HighlightCandidate::Today(task) | HighlightCandidate::CarriedOver(task) => task,
        }
    }
}

/// Today's highlight if there is one, otherwise yesterday's if it is not
/// finished.
pub fn highlight_candidate(
    today: Option<Task>,
    yesterday: Option<Task>,
) -> Option<HighlightCandidate> {
    if let Some(task) = today {
        return Some(HighlightCandidate::Today(task));
    }
    yesterday
        .filter(|task| task.status != TaskStatus::Completed)
        .map(HighlightCandidate::CarriedOver)
}
