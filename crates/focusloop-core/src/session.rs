//! Session entity.
//!
//! A session is one timed work or break interval. Like the rest of the
//! engine it never ticks: remaining and elapsed time are derived from
//! wall-clock instants whenever they are asked for.
//!
//! ## State Transitions
//!
//! ```text
//! Running <-> Paused
//! Running | Paused -> Completed -> Voided
//! Running | Paused -> Cancelled
//! ```
//!
//! Resuming shifts `started_at` forward by the length of the pause, so the
//! span `started_at..now` always measures worked time only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, ValidationError};
use crate::git::GitContext;
use crate::methodology::Methodology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn is_break(&self) -> bool {
        matches!(self, SessionKind::ShortBreak | SessionKind::LongBreak)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::ShortBreak => "short_break",
            SessionKind::LongBreak => "long_break",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Cancelled,
    /// Completed, but excluded from statistics because it was interrupted.
    Voided,
}

impl SessionStatus {
    /// Running or Paused. At most one session may be active at a time.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Voided => "voided",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a distraction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionCategory {
    /// Self-generated: a stray thought, an urge to check something.
    Internal,
    /// Someone or something else: a message, a colleague, a notification.
    External,
    #[default]
    Other,
}

impl FromStr for DistractionCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Ok(DistractionCategory::Internal),
            "external" => Ok(DistractionCategory::External),
            "other" => Ok(DistractionCategory::Other),
            other => Err(ValidationError::InvalidValue {
                field: "category".into(),
                message: format!("unknown distraction category '{other}'"),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distraction {
    pub text: String,
    #[serde(default)]
    pub category: DistractionCategory,
    pub logged_at: DateTime<Utc>,
}

/// End-of-day reflection recorded after a deep work block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownRitual {
    /// Loose ends reviewed before shutting down.
    pub pending_review: Option<String>,
    pub tomorrow_plan: Option<String>,
    pub closing_phrase: Option<String>,
}

/// One timed work or break interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    pub(crate) status: SessionStatus,
    /// Methodology that produced the session, so history survives a switch.
    pub methodology: Methodology,
    /// Planned duration in milliseconds, fixed at creation.
    pub(crate) planned_ms: u64,
    /// Logical start. Moves forward on resume by the paused span.
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) paused_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    /// Weak reference; the task may since have been deleted.
    pub task_id: Option<String>,
    pub focus_score: Option<u8>,
    #[serde(default)]
    pub distractions: Vec<Distraction>,
    pub shutdown_ritual: Option<ShutdownRitual>,
    pub accomplishment: Option<String>,
    pub intended_outcome: Option<String>,
    pub energize_activity: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub git: Option<GitContext>,
}

impl Session {
    /// Create a new Running session starting at `now`.
    ///
    /// Negative durations are treated as zero.
    pub fn new(
        kind: SessionKind,
        methodology: Methodology,
        planned: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: SessionStatus::Running,
            methodology,
            planned_ms: planned.num_milliseconds().max(0) as u64,
            started_at: now,
            paused_at: None,
            completed_at: None,
            task_id: None,
            focus_score: None,
            distractions: Vec::new(),
            shutdown_ritual: None,
            accomplishment: None,
            intended_outcome: None,
            energize_activity: None,
            notes: String::new(),
            tags: Vec::new(),
            git: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn planned_ms(&self) -> u64 {
        self.planned_ms
    }

    pub fn planned_duration(&self) -> Duration {
        ms_duration(self.planned_ms)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Instant at which a Running session reaches its planned duration.
    pub fn planned_end(&self) -> DateTime<Utc> {
        self.started_at + self.planned_duration()
    }

    /// Worked time so far. Frozen while paused; pauses never count.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = match self.status {
            SessionStatus::Running => now,
            SessionStatus::Paused => self.paused_at.unwrap_or(now),
            SessionStatus::Completed | SessionStatus::Voided => match self.completed_at {
                Some(at) => at,
                None => return Duration::zero(),
            },
            SessionStatus::Cancelled => return Duration::zero(),
        };
        (end - self.started_at).max(Duration::zero())
    }

    /// Time left before the planned duration is reached, floored at zero.
    /// Zero for any session that is not Running or Paused.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if !self.is_active() {
            return Duration::zero();
        }
        (self.planned_duration() - self.elapsed(now)).max(Duration::zero())
    }

    /// 0.0 ..= 1.0 progress toward the planned duration.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.planned_ms == 0 {
            return 0.0;
        }
        let elapsed = self.elapsed(now).num_milliseconds().max(0) as f64;
        (elapsed / self.planned_ms as f64).clamp(0.0, 1.0)
    }

    /// Running with no time left: the interval is over but nobody stopped it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Running && self.remaining(now).is_zero()
    }

    /// Worked duration of a finished session (`completed_at - started_at`).
    pub fn actual_duration(&self) -> Duration {
        match self.completed_at {
            Some(at) => (at - self.started_at).max(Duration::zero()),
            None => Duration::zero(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────
    //
    // Each command returns whether the transition happened; invalid
    // transitions are no-ops.

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        true
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != SessionStatus::Paused || self.paused_at.is_none() {
            return false;
        }
        self.fold_pause(now);
        self.status = SessionStatus::Running;
        true
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.fold_pause(now);
        self.status = SessionStatus::Completed;
        self.completed_at = Some(now);
        true
    }

    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = SessionStatus::Cancelled;
        true
    }

    /// Reclassify a completed session as not counting toward statistics.
    pub fn void(&mut self) -> bool {
        if self.status != SessionStatus::Completed {
            return false;
        }
        self.status = SessionStatus::Voided;
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Shift the logical start past an open pause and clear it.
    fn fold_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.started_at += (now - paused_at).max(Duration::zero());
        }
    }
}

pub(crate) fn ms_duration(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
