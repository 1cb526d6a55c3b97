//! SQLite-backed [`Storage`] implementation.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, `Z` suffix) so that string comparison in SQL orders them
//! chronologically. List-valued fields are stored as JSON text.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, Storage};
use crate::error::{CoreError, DatabaseError, Result};
use crate::methodology::Methodology;
use crate::session::{Session, SessionKind, SessionStatus};
use crate::task::{Task, TaskStatus};

const SESSION_COLUMNS: &str = "id, kind, status, methodology, planned_ms, started_at, paused_at,
     completed_at, task_id, focus_score, distractions, shutdown_ritual, accomplishment,
     intended_outcome, energize_activity, notes, tags, git_context";

const TASK_COLUMNS: &str =
    "id, title, description, status, tags, created_at, updated_at, completed_at, highlight_date";

// === Helper Functions ===

fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse datetime from RFC3339 string with fallback to the Unix epoch.
fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_ts_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_session_kind(s: &str) -> SessionKind {
    match s {
        "short_break" => SessionKind::ShortBreak,
        "long_break" => SessionKind::LongBreak,
        _ => SessionKind::Work,
    }
}

/// Unknown statuses read as Cancelled so a corrupt row can never pose as
/// the active session or leak into statistics.
fn parse_session_status(s: &str) -> SessionStatus {
    match s {
        "running" => SessionStatus::Running,
        "paused" => SessionStatus::Paused,
        "completed" => SessionStatus::Completed,
        "voided" => SessionStatus::Voided,
        _ => SessionStatus::Cancelled,
    }
}

fn parse_task_status(s: &str) -> TaskStatus {
    match s {
        "in_progress" => TaskStatus::InProgress,
        "completed" => TaskStatus::Completed,
        "cancelled" => TaskStatus::Cancelled,
        _ => TaskStatus::Pending,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_json_opt<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(to_json).transpose()
}

/// Build a Session from a row selected with [`SESSION_COLUMNS`].
fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let kind: String = row.get(1)?;
    let status: String = row.get(2)?;
    let methodology: String = row.get(3)?;
    let started_at: String = row.get(5)?;
    let distractions: String = row.get(10)?;
    let shutdown_ritual: Option<String> = row.get(11)?;
    let tags: String = row.get(16)?;
    let git_context: Option<String> = row.get(17)?;

    Ok(Session {
        id: row.get(0)?,
        kind: parse_session_kind(&kind),
        status: parse_session_status(&status),
        methodology: methodology.parse().unwrap_or(Methodology::Pomodoro),
        planned_ms: row.get::<_, i64>(4)?.max(0) as u64,
        started_at: parse_ts(&started_at),
        paused_at: parse_ts_opt(row.get(6)?),
        completed_at: parse_ts_opt(row.get(7)?),
        task_id: row.get(8)?,
        focus_score: row.get(9)?,
        distractions: serde_json::from_str(&distractions).unwrap_or_default(),
        shutdown_ritual: shutdown_ritual.and_then(|s| serde_json::from_str(&s).ok()),
        accomplishment: row.get(12)?,
        intended_outcome: row.get(13)?,
        energize_activity: row.get(14)?,
        notes: row.get(15)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        git: git_context.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Build a Task from a row selected with [`TASK_COLUMNS`].
fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let tags: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    let highlight_date: Option<String> = row.get(8)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_task_status(&status),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
        completed_at: parse_ts_opt(row.get(7)?),
        highlight_date: highlight_date
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}

fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO sessions ({SESSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            session.id,
            session.kind.as_str(),
            session.status.as_str(),
            session.methodology.as_str(),
            i64::try_from(session.planned_ms).unwrap_or(i64::MAX),
            format_ts(session.started_at),
            session.paused_at.map(format_ts),
            session.completed_at.map(format_ts),
            session.task_id,
            session.focus_score,
            to_json(&session.distractions)?,
            to_json_opt(session.shutdown_ritual.as_ref())?,
            session.accomplishment,
            session.intended_outcome,
            session.energize_activity,
            session.notes,
            to_json(&session.tags)?,
            to_json_opt(session.git.as_ref())?,
        ],
    )?;
    Ok(())
}

fn write_task(conn: &Connection, task: &Task) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE tasks SET title = ?2, description = ?3, status = ?4, tags = ?5,
                created_at = ?6, updated_at = ?7, completed_at = ?8, highlight_date = ?9
         WHERE id = ?1",
        params![
            task.id,
            task.title,
            task.description,
            task.status.as_str(),
            to_json(&task.tags)?,
            format_ts(task.created_at),
            format_ts(task.updated_at),
            task.completed_at.map(format_ts),
            task.highlight_date.map(format_date),
        ],
    )?;
    Ok(changed)
}

/// SQLite database for sessions and tasks.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/focusloop/focusloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("focusloop.db"))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        tracing::debug!(
            version = migrations::get_schema_version(&conn),
            "database schema ready"
        );
        Ok(Self { conn })
    }

    fn query_sessions(
        &self,
        where_clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions {where_clause}"
        ))?;
        let rows = stmt.query_map(params, row_to_session)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_task(&self, where_clause: &str, params: impl rusqlite::Params) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks {where_clause}"),
                params,
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }
}

impl Storage for Database {
    fn find_active_session(&self) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE status IN ('running', 'paused')
                     ORDER BY started_at DESC LIMIT 1"
                ),
                [],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        insert_session(&self.conn, session)
    }

    fn update_session(&self, session: &Session) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions SET kind = ?2, status = ?3, methodology = ?4, planned_ms = ?5,
                    started_at = ?6, paused_at = ?7, completed_at = ?8, task_id = ?9,
                    focus_score = ?10, distractions = ?11, shutdown_ritual = ?12,
                    accomplishment = ?13, intended_outcome = ?14, energize_activity = ?15,
                    notes = ?16, tags = ?17, git_context = ?18
             WHERE id = ?1",
            params![
                session.id,
                session.kind.as_str(),
                session.status.as_str(),
                session.methodology.as_str(),
                i64::try_from(session.planned_ms).unwrap_or(i64::MAX),
                format_ts(session.started_at),
                session.paused_at.map(format_ts),
                session.completed_at.map(format_ts),
                session.task_id,
                session.focus_score,
                to_json(&session.distractions)?,
                to_json_opt(session.shutdown_ritual.as_ref())?,
                session.accomplishment,
                session.intended_outcome,
                session.energize_activity,
                session.notes,
                to_json(&session.tags)?,
                to_json_opt(session.git.as_ref())?,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::SessionNotFound(session.id.clone()));
        }
        Ok(())
    }

    fn save_session_with_task(&self, session: &Session, task: Option<&Task>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_session(&tx, session)?;
        if let Some(task) = task {
            if write_task(&tx, task)? == 0 {
                return Err(CoreError::TaskNotFound(task.id.clone()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_session_by_id(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.query_sessions("WHERE id = ?1", params![id])?.into_iter().next())
    }

    fn find_sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<Session>> {
        self.query_sessions(
            "WHERE started_at >= ?1 ORDER BY started_at ASC",
            params![format_ts(since)],
        )
    }

    fn find_sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        self.query_sessions(
            "WHERE started_at >= ?1 AND started_at < ?2 ORDER BY started_at ASC",
            params![format_ts(start), format_ts(end)],
        )
    }

    fn find_sessions_by_task(&self, task_id: &str) -> Result<Vec<Session>> {
        self.query_sessions(
            "WHERE task_id = ?1 ORDER BY started_at ASC",
            params![task_id],
        )
    }

    fn save_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                to_json(&task.tags)?,
                format_ts(task.created_at),
                format_ts(task.updated_at),
                task.completed_at.map(format_ts),
                task.highlight_date.map(format_date),
            ],
        )?;
        Ok(())
    }

    fn find_task_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.query_task("WHERE id = ?1", params![id])
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        if write_task(&self.conn, task)? == 0 {
            return Err(CoreError::TaskNotFound(task.id.clone()));
        }
        Ok(())
    }

    fn update_tasks(&self, tasks: &[&Task]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for task in tasks {
            if write_task(&tx, task)? == 0 {
                return Err(CoreError::TaskNotFound(task.id.clone()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map([], row_to_task)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_active_task(&self) -> Result<Option<Task>> {
        self.query_task(
            "WHERE status = 'in_progress' ORDER BY updated_at DESC LIMIT 1",
            [],
        )
    }

    fn find_recent_tasks_with_sessions(&self, limit: usize) -> Result<Vec<Task>> {
        let columns = TASK_COLUMNS
            .split(", ")
            .map(|c| format!("t.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {columns} FROM tasks t
             JOIN (SELECT task_id, MAX(started_at) AS last_started
                   FROM sessions WHERE task_id IS NOT NULL GROUP BY task_id) s
               ON s.task_id = t.id
             ORDER BY s.last_started DESC
             LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_task)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_highlight_for_date(&self, date: NaiveDate) -> Result<Option<Task>> {
        self.query_task(
            "WHERE highlight_date = ?1 ORDER BY updated_at DESC LIMIT 1",
            params![format_date(date)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Distraction, DistractionCategory, ShutdownRitual};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    fn work_at(at: DateTime<Utc>) -> Session {
        Session::new(SessionKind::Work, Methodology::DeepWork, Duration::minutes(90), at)
    }

    #[test]
    fn session_roundtrip_preserves_payload() {
        let db = Database::open_memory().unwrap();
        let mut session = work_at(t0());
        session.task_id = Some("task-1".into());
        session.focus_score = Some(4);
        session.tags = vec!["coding".into()];
        session.distractions.push(Distraction {
            text: "slack ping".into(),
            category: DistractionCategory::External,
            logged_at: t0() + Duration::minutes(3),
        });
        session.shutdown_ritual = Some(ShutdownRitual {
            pending_review: Some("inbox".into()),
            tomorrow_plan: None,
            closing_phrase: Some("shutdown complete".into()),
        });
        session.pause(t0() + Duration::minutes(10));

        db.save_session(&session).unwrap();
        let loaded = db.find_session_by_id(&session.id).unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[test]
    fn find_active_ignores_finished_sessions() {
        let db = Database::open_memory().unwrap();
        let mut done = work_at(t0());
        done.complete(t0() + Duration::minutes(90));
        db.save_session(&done).unwrap();
        assert!(db.find_active_session().unwrap().is_none());

        let running = work_at(t0() + Duration::hours(2));
        db.save_session(&running).unwrap();
        assert_eq!(db.find_active_session().unwrap().unwrap().id, running.id);
    }

    #[test]
    fn update_missing_session_is_not_found() {
        let db = Database::open_memory().unwrap();
        let session = work_at(t0());
        assert!(matches!(
            db.update_session(&session),
            Err(CoreError::SessionNotFound(_))
        ));
    }

    #[test]
    fn sessions_between_is_half_open() {
        let db = Database::open_memory().unwrap();
        for hours in [0, 1, 2] {
            db.save_session(&work_at(t0() + Duration::hours(hours))).unwrap();
        }
        let found = db
            .find_sessions_between(t0(), t0() + Duration::hours(2))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(db.find_sessions_since(t0() + Duration::hours(1)).unwrap().len(), 2);
    }

    #[test]
    fn save_session_with_missing_task_rolls_back() {
        let db = Database::open_memory().unwrap();
        let ghost = Task::new("never saved", t0());
        let session = work_at(t0());
        assert!(matches!(
            db.save_session_with_task(&session, Some(&ghost)),
            Err(CoreError::TaskNotFound(_))
        ));
        assert!(db.find_session_by_id(&session.id).unwrap().is_none());
    }

    #[test]
    fn task_crud_and_highlight_lookup() {
        let db = Database::open_memory().unwrap();
        let mut task = Task::from_input("Ship release #ops", t0());
        db.save_task(&task).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert!(db.find_highlight_for_date(day).unwrap().is_none());

        task.highlight_date = Some(day);
        task.start(t0());
        db.update_task(&task).unwrap();

        assert_eq!(db.find_highlight_for_date(day).unwrap().unwrap().id, task.id);
        assert_eq!(db.find_active_task().unwrap().unwrap().id, task.id);
        assert_eq!(db.find_task_by_id(&task.id).unwrap().unwrap(), task);

        db.delete_task(&task.id).unwrap();
        assert!(db.find_task_by_id(&task.id).unwrap().is_none());
        assert!(matches!(db.delete_task(&task.id), Err(CoreError::TaskNotFound(_))));
    }

    #[test]
    fn update_tasks_rolls_back_on_missing_task() {
        let db = Database::open_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let mut previous = Task::new("Old highlight", t0());
        previous.highlight_date = Some(day);
        db.save_task(&previous).unwrap();

        previous.highlight_date = None;
        let mut ghost = Task::new("never saved", t0());
        ghost.highlight_date = Some(day);
        assert!(matches!(
            db.update_tasks(&[&previous, &ghost]),
            Err(CoreError::TaskNotFound(id)) if id == ghost.id
        ));

        let kept = db.find_highlight_for_date(day).unwrap().unwrap();
        assert_eq!(kept.id, previous.id);
    }

    #[test]
    fn deleting_task_keeps_sessions() {
        let db = Database::open_memory().unwrap();
        let task = Task::new("Write", t0());
        db.save_task(&task).unwrap();
        let mut session = work_at(t0());
        session.task_id = Some(task.id.clone());
        db.save_session(&session).unwrap();

        db.delete_task(&task.id).unwrap();
        let sessions = db.find_sessions_by_task(&task.id).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].task_id.as_deref(), Some(task.id.as_str()));
    }

    #[test]
    fn recent_tasks_ordered_by_last_session() {
        let db = Database::open_memory().unwrap();
        let older = Task::new("older", t0());
        let newer = Task::new("newer", t0());
        let idle = Task::new("idle", t0());
        for task in [&older, &newer, &idle] {
            db.save_task(task).unwrap();
        }
        for (task, offset) in [(&older, 0), (&newer, 3), (&older, 1)] {
            let mut s = work_at(t0() + Duration::hours(offset));
            s.task_id = Some(task.id.clone());
            db.save_session(&s).unwrap();
        }

        let recent = db.find_recent_tasks_with_sessions(10).unwrap();
        let titles: Vec<&str> = recent.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
        assert_eq!(db.find_recent_tasks_with_sessions(1).unwrap().len(), 1);
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusloop.db");
        let session = work_at(t0());
        {
            let db = Database::open_at(&path).unwrap();
            db.save_session(&session).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.find_session_by_id(&session.id).unwrap().is_some());
    }
}
