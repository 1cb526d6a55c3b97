//! Session scheduling service.
//!
//! Owns every transition of "what is the user working on right now". The
//! service keeps no session cache: each call reads the active session from
//! storage, applies the transition on a copy, and persists it before
//! returning. A failed write therefore leaves no observable change.
//!
//! ```ignore
//! let scheduler = SessionScheduler::new(Database::open()?, SystemClock, Config::load()?);
//! scheduler.start_work(StartWork::new(Methodology::Pomodoro))?;
//! scheduler.pause()?;
//! scheduler.resume()?;
//! scheduler.stop()?;
//! ```

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{CoreError, Result, ValidationError};
use crate::git::GitContextProvider;
use crate::methodology::{highlight_candidate, HighlightCandidate, Methodology, MethodologyPolicy};
use crate::session::{Distraction, DistractionCategory, Session, SessionKind, ShutdownRitual};
use crate::stats::{self, Analytics, DailyStats};
use crate::storage::{Config, Storage};
use crate::task::Task;

/// What a transition does with a session whose planned time ran out
/// before anyone stopped it.
#[derive(Debug, Clone, Copy)]
enum OnExpiry {
    /// Run the transition at the planned end.
    Finish,
    /// Complete the session at the planned end and report nothing active.
    Reject,
}

/// Parameters for [`SessionScheduler::start_work`].
#[derive(Debug, Clone)]
pub struct StartWork {
    pub methodology: Methodology,
    pub task_id: Option<String>,
    /// Falls back to the methodology's first preset.
    pub duration: Option<Duration>,
    pub intended_outcome: Option<String>,
    pub tags: Vec<String>,
    /// Directory to read git context from.
    pub working_dir: Option<PathBuf>,
}

impl StartWork {
    pub fn new(methodology: Methodology) -> Self {
        Self {
            methodology,
            task_id: None,
            duration: None,
            intended_outcome: None,
            tags: Vec::new(),
            working_dir: None,
        }
    }

    pub fn task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.intended_outcome = Some(outcome.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Snapshot returned by [`SessionScheduler::current_state`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentState {
    pub active_task: Option<Task>,
    pub active_session: Option<Session>,
    pub today: DailyStats,
}

pub struct SessionScheduler<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    config: Config,
    git: Option<Box<dyn GitContextProvider>>,
}

impl<S: Storage, C: Clock> SessionScheduler<S, C> {
    pub fn new(storage: S, clock: C, config: Config) -> Self {
        Self {
            storage,
            clock,
            config,
            git: None,
        }
    }

    /// Capture repository context on work starts that name a directory.
    pub fn with_git(mut self, provider: impl GitContextProvider + 'static) -> Self {
        self.git = Some(Box::new(provider));
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self, methodology: Methodology) -> MethodologyPolicy {
        self.config.policy(methodology)
    }

    pub fn analytics(&self) -> Analytics<'_, S, C> {
        Analytics::new(&self.storage, &self.clock)
    }

    // ── Starting ─────────────────────────────────────────────────────

    /// Start a work session.
    ///
    /// # Errors
    /// `SessionAlreadyActive` if a session is Running or Paused,
    /// `TaskNotFound` for an unknown task id, `Validation` for a
    /// non-positive duration.
    pub fn start_work(&self, request: StartWork) -> Result<Session> {
        self.ensure_idle()?;
        let now = self.clock.now();
        let policy = self.policy(request.methodology);

        let duration = request
            .duration
            .unwrap_or_else(|| policy.default_work_duration());
        if duration <= Duration::zero() {
            return Err(ValidationError::InvalidValue {
                field: "duration".into(),
                message: "must be positive".into(),
            }
            .into());
        }

        let task = match request.task_id.as_deref() {
            Some(id) => {
                let mut task = self
                    .storage
                    .find_task_by_id(id)?
                    .ok_or_else(|| CoreError::TaskNotFound(id.to_string()))?;
                task.start(now);
                Some(task)
            }
            None => None,
        };

        let mut session = Session::new(SessionKind::Work, request.methodology, duration, now);
        session.task_id = task.as_ref().map(|t| t.id.clone());
        session.intended_outcome = non_empty(request.intended_outcome);
        session.tags = request.tags;
        session.git = match (&self.git, &request.working_dir) {
            (Some(provider), Some(dir)) => provider.detect(dir),
            _ => None,
        };

        self.storage.save_session_with_task(&session, task.as_ref())?;
        info!(
            session_id = %session.id,
            methodology = %session.methodology,
            planned_ms = session.planned_ms(),
            task_id = ?session.task_id,
            "started work session"
        );
        Ok(session)
    }

    /// Start the break that follows today's completed work for `methodology`.
    ///
    /// # Errors
    /// `SessionAlreadyActive` if a session is Running or Paused.
    pub fn start_break(&self, methodology: Methodology) -> Result<Session> {
        self.ensure_idle()?;
        let now = self.clock.now();

        let today = self.clock.today();
        let (start, end) = stats::local_day_bounds(today, self.clock.offset_on(today));
        let sessions = self.storage.find_sessions_between(start, end)?;
        let completed = stats::completed_work_count(&sessions, Some(methodology));
        let plan = self.policy(methodology).break_plan(completed);

        let session = Session::new(plan.kind, methodology, plan.duration, now);
        self.storage.save_session(&session)?;
        info!(
            session_id = %session.id,
            kind = %session.kind,
            completed_work = completed,
            "started break"
        );
        Ok(session)
    }

    // ── Active session transitions ───────────────────────────────────

    pub fn pause(&self) -> Result<Session> {
        self.transition_active(
            OnExpiry::Reject,
            |session, now| session.pause(now),
            "paused session",
        )
    }

    pub fn resume(&self) -> Result<Session> {
        self.transition_active(
            OnExpiry::Reject,
            |session, now| session.resume(now),
            "resumed session",
        )
    }

    /// Complete the active session now, or at its planned end if that has
    /// already passed.
    pub fn stop(&self) -> Result<Session> {
        self.transition_active(
            OnExpiry::Finish,
            |session, now| session.complete(now),
            "completed session",
        )
    }

    pub fn cancel(&self) -> Result<Session> {
        self.transition_active(
            OnExpiry::Reject,
            |session, _| session.cancel(),
            "cancelled session",
        )
    }

    /// Complete the active session and exclude it from statistics.
    pub fn void(&self) -> Result<Session> {
        self.transition_active(
            OnExpiry::Finish,
            |session, now| session.complete(now) && session.void(),
            "voided session",
        )
    }

    /// Void a session that was already completed.
    ///
    /// # Errors
    /// `SessionNotFound`, or `Validation` if the session is not Completed.
    pub fn void_session(&self, id: &str) -> Result<Session> {
        self.update_session(id, |session| {
            if session.void() {
                Ok(())
            } else {
                Err(ValidationError::InvalidValue {
                    field: "status".into(),
                    message: format!("cannot void a {} session", session.status()),
                }
                .into())
            }
        })
    }

    // ── Annotations ──────────────────────────────────────────────────

    pub fn log_distraction(
        &self,
        session_id: &str,
        text: &str,
        category: Option<DistractionCategory>,
    ) -> Result<Session> {
        let text = required_text("distraction", text)?;
        let logged_at = self.clock.now();
        self.update_session(session_id, |session| {
            session.distractions.push(Distraction {
                text,
                category: category.unwrap_or_default(),
                logged_at,
            });
            Ok(())
        })
    }

    /// Record a 1-5 focus rating.
    pub fn set_focus_score(&self, session_id: &str, score: u8) -> Result<Session> {
        if !(1..=5).contains(&score) {
            return Err(ValidationError::InvalidValue {
                field: "focus_score".into(),
                message: format!("{score} is outside 1-5"),
            }
            .into());
        }
        self.update_session(session_id, |session| {
            session.focus_score = Some(score);
            Ok(())
        })
    }

    pub fn set_accomplishment(&self, session_id: &str, text: &str) -> Result<Session> {
        let text = required_text("accomplishment", text)?;
        self.update_session(session_id, |session| {
            session.accomplishment = Some(text);
            Ok(())
        })
    }

    pub fn set_shutdown_ritual(&self, session_id: &str, ritual: ShutdownRitual) -> Result<Session> {
        self.update_session(session_id, |session| {
            session.shutdown_ritual = Some(ritual);
            Ok(())
        })
    }

    pub fn set_energize_activity(&self, session_id: &str, activity: &str) -> Result<Session> {
        let activity = required_text("energize_activity", activity)?;
        self.update_session(session_id, |session| {
            session.energize_activity = Some(activity);
            Ok(())
        })
    }

    /// Append to the session's notes, one entry per line.
    pub fn add_notes(&self, session_id: &str, notes: &str) -> Result<Session> {
        let notes = required_text("notes", notes)?;
        self.update_session(session_id, |session| {
            if !session.notes.is_empty() {
                session.notes.push('\n');
            }
            session.notes.push_str(&notes);
            Ok(())
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Active task, live session and today's totals.
    ///
    /// A Running session whose planned time has fully elapsed is completed
    /// at its planned end and persisted. That write is best effort: if it
    /// fails the session is still left out of the snapshot.
    pub fn current_state(&self) -> Result<CurrentState> {
        let active_session = self.live_session()?;

        let active_task = match active_session.as_ref().and_then(|s| s.task_id.as_deref()) {
            Some(id) => self.storage.find_task_by_id(id)?,
            None => self.storage.find_active_task()?,
        };

        Ok(CurrentState {
            active_task,
            active_session,
            today: self.analytics().today()?,
        })
    }

    pub fn deep_work_streak(&self, threshold: Duration) -> Result<u32> {
        self.analytics().deep_work_streak(threshold)
    }

    pub fn find_session(&self, id: &str) -> Result<Session> {
        self.storage
            .find_session_by_id(id)?
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))
    }

    pub fn session_history(&self, task_id: &str) -> Result<Vec<Session>> {
        self.storage.find_sessions_by_task(task_id)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Create a Pending task from input such as `"Draft intro #writing"`.
    pub fn create_task(&self, input: &str) -> Result<Task> {
        let task = Task::from_input(input, self.clock.now());
        if task.title.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "must not be empty".into(),
            }
            .into());
        }
        self.storage.save_task(&task)?;
        debug!(task_id = %task.id, "created task");
        Ok(task)
    }

    pub fn recent_tasks(&self, limit: usize) -> Result<Vec<Task>> {
        self.storage.find_recent_tasks_with_sessions(limit)
    }

    /// Today's highlight, or yesterday's unfinished one to carry over.
    pub fn highlight_candidate(&self) -> Result<Option<HighlightCandidate>> {
        let today = self.clock.today();
        let todays = self.storage.find_highlight_for_date(today)?;
        let yesterdays = match (&todays, today.pred_opt()) {
            (None, Some(yesterday)) => self.storage.find_highlight_for_date(yesterday)?,
            _ => None,
        };
        Ok(highlight_candidate(todays, yesterdays))
    }

    /// Make `task_id` today's highlight, replacing any previous one.
    pub fn set_highlight(&self, task_id: &str) -> Result<Task> {
        let today = self.clock.today();
        let now = self.clock.now();
        let mut task = self
            .storage
            .find_task_by_id(task_id)?
            .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;

        let previous = match self.storage.find_highlight_for_date(today)? {
            Some(mut previous) if previous.id != task.id => {
                previous.highlight_date = None;
                previous.updated_at = now;
                Some(previous)
            }
            _ => None,
        };

        task.highlight_date = Some(today);
        task.updated_at = now;
        let mut changed = vec![&task];
        changed.extend(previous.as_ref());
        self.storage.update_tasks(&changed)?;
        info!(task_id = %task.id, date = %today, "set daily highlight");
        Ok(task)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Active session with expiry applied. A failed reconciliation write is
    /// logged and the session is still reported as finished.
    fn live_session(&self) -> Result<Option<Session>> {
        let Some(mut session) = self.storage.find_active_session()? else {
            return Ok(None);
        };
        if !session.is_expired(self.clock.now()) {
            return Ok(Some(session));
        }

        if let Err(e) = self.complete_expired(&mut session) {
            warn!(session_id = %session.id, "failed to persist expired session: {e}");
        }
        Ok(None)
    }

    /// Complete an expired session at its planned end and persist it.
    fn complete_expired(&self, session: &mut Session) -> Result<()> {
        session.complete(session.planned_end());
        self.storage.update_session(session)?;
        debug!(session_id = %session.id, "completed expired session");
        Ok(())
    }

    /// Start precondition. Unlike [`Self::live_session`], an expired session
    /// only counts as finished once its completion is stored.
    fn ensure_idle(&self) -> Result<()> {
        let Some(mut session) = self.storage.find_active_session()? else {
            return Ok(());
        };
        if !session.is_expired(self.clock.now()) {
            return Err(CoreError::SessionAlreadyActive { id: session.id });
        }
        self.complete_expired(&mut session)
    }

    /// Apply `apply` to the active session and persist it. A transition the
    /// session rejects is reported as `NoActiveSession`.
    ///
    /// An expired session is settled first: with [`OnExpiry::Finish`] the
    /// transition runs at the planned end, with [`OnExpiry::Reject`] the
    /// session is completed there and the call fails.
    fn transition_active<F>(
        &self,
        on_expiry: OnExpiry,
        apply: F,
        message: &'static str,
    ) -> Result<Session>
    where
        F: FnOnce(&mut Session, chrono::DateTime<chrono::Utc>) -> bool,
    {
        let mut session = self
            .storage
            .find_active_session()?
            .ok_or(CoreError::NoActiveSession)?;

        let mut now = self.clock.now();
        if session.is_expired(now) {
            match on_expiry {
                OnExpiry::Finish => now = session.planned_end(),
                OnExpiry::Reject => {
                    self.complete_expired(&mut session)?;
                    return Err(CoreError::NoActiveSession);
                }
            }
        }

        if !apply(&mut session, now) {
            return Err(CoreError::NoActiveSession);
        }
        self.storage.update_session(&session)?;
        info!(session_id = %session.id, status = %session.status(), "{message}");
        Ok(session)
    }

    fn update_session<F>(&self, id: &str, apply: F) -> Result<Session>
    where
        F: FnOnce(&mut Session) -> Result<()>,
    {
        let mut session = self.find_session(id)?;
        apply(&mut session)?;
        self.storage.update_session(&session)?;
        debug!(session_id = %session.id, "updated session");
        Ok(session)
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn required_text(field: &str, text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            message: "must not be empty".into(),
        }
        .into());
    }
    Ok(text.to_string())
}
