mod config;
pub mod database;
pub mod migrations;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{ConfigError, Result};
use crate::session::Session;
use crate::task::Task;

/// Persistence port for sessions and tasks.
///
/// Storage is the single source of truth for what is active: the scheduler
/// keeps no copy of its own and re-reads through this trait on every call.
/// Implementations must make each method atomic.
pub trait Storage {
    /// The Running or Paused session, if any.
    fn find_active_session(&self) -> Result<Option<Session>>;

    fn save_session(&self, session: &Session) -> Result<()>;

    /// Overwrite a stored session. Fails with `SessionNotFound` if absent.
    fn update_session(&self, session: &Session) -> Result<()>;

    /// Insert a session and update the task it references in one commit.
    ///
    /// The default implementation is not atomic; backends that support
    /// transactions should override it.
    fn save_session_with_task(&self, session: &Session, task: Option<&Task>) -> Result<()> {
        self.save_session(session)?;
        if let Some(task) = task {
            self.update_task(task)?;
        }
        Ok(())
    }

    fn find_session_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Sessions started at or after `since`, oldest first.
    fn find_sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<Session>>;

    /// Sessions started in `[start, end)`, oldest first.
    fn find_sessions_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<Session>>;

    fn find_sessions_by_task(&self, task_id: &str) -> Result<Vec<Session>>;

    fn save_task(&self, task: &Task) -> Result<()>;

    fn find_task_by_id(&self, id: &str) -> Result<Option<Task>>;

    /// Overwrite a stored task. Fails with `TaskNotFound` if absent.
    fn update_task(&self, task: &Task) -> Result<()>;

    /// Overwrite several tasks in one commit. Fails with `TaskNotFound` on
    /// the first absent task, leaving every task unchanged.
    ///
    /// The default implementation is not atomic.
    fn update_tasks(&self, tasks: &[&Task]) -> Result<()> {
        for task in tasks {
            self.update_task(task)?;
        }
        Ok(())
    }

    /// Remove a task. Sessions referencing it are kept.
    fn delete_task(&self, id: &str) -> Result<()>;

    fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Most recently touched task that is in progress.
    fn find_active_task(&self) -> Result<Option<Task>>;

    /// Tasks that have at least one session, most recently worked first.
    fn find_recent_tasks_with_sessions(&self, limit: usize) -> Result<Vec<Task>>;

    fn find_highlight_for_date(&self, date: NaiveDate) -> Result<Option<Task>>;
}

/// Returns `~/.config/focusloop[-dev]/` based on FOCUSLOOP_ENV.
///
/// Set FOCUSLOOP_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSLOOP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusloop-dev")
    } else {
        base_dir.join("focusloop")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
