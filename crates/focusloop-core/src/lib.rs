//! # Focusloop Core Library
//!
//! Core business logic for the focusloop productivity timer. All operations
//! are available through the standalone `focusloop` CLI, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Session**: A wall-clock interval entity. There is no ticking thread;
//!   elapsed and remaining time are computed from timestamps on demand
//! - **Methodology**: Pomodoro, Deep Work and Make Time policies (presets,
//!   break selection, rituals)
//! - **Scheduler**: The service enforcing a single active session and
//!   persisting every transition
//! - **Stats**: Read-only analytics over the session log
//! - **Storage**: SQLite-based session and task storage and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`SessionScheduler`]: Session lifecycle service
//! - [`Analytics`]: Daily, period, streak and correlation queries
//! - [`Database`]: Session and task persistence
//! - [`Config`]: Application configuration management
//! - [`Clock`]: Injectable time source

pub mod clock;
pub mod error;
pub mod git;
pub mod methodology;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use git::{GitCli, GitContext, GitContextProvider};
pub use methodology::{HighlightCandidate, Methodology, MethodologyPolicy};
pub use scheduler::{CurrentState, SessionScheduler, StartWork};
pub use session::{Distraction, DistractionCategory, Session, SessionKind, SessionStatus, ShutdownRitual};
pub use stats::{Analytics, DailyStats, EnergizeStat, HourlyProductivity, PeriodStats};
pub use storage::{Config, Database, Storage};
pub use task::{Task, TaskStatus};
