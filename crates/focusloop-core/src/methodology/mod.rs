//! Methodology policies.
//!
//! A methodology bundles preset durations, break rules and the optional
//! rituals around a session. The set is closed: [`MethodologyPolicy`] is an
//! enum whose variants each carry their own configuration, and every rule
//! that differs between methodologies is an exhaustive match over it.
//!
//! The policy only recommends; callers may override any duration.

mod highlight;
mod tags;

pub use highlight::{highlight_candidate, HighlightCandidate};
pub use tags::parse_tags;

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::SessionKind;

/// Pomodoro takes a long break after every fourth work session. This is
/// part of the method, not a user preference.
pub const POMODORO_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;

/// Readiness prompts shown before a Make Time session. Answers never block.
pub const LASER_CHECKLIST: [&str; 4] = [
    "Phone out of reach or on do-not-disturb?",
    "Notifications and chat closed?",
    "Only the tabs you need for the highlight open?",
    "Water and anything else you need within reach?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    /// Classic short intervals with alternating short/long breaks.
    Pomodoro,
    /// Long uninterrupted blocks with a shutdown ritual.
    DeepWork,
    /// Days organised around a single highlight task.
    MakeTime,
}

impl Methodology {
    pub const ALL: [Methodology; 3] = [
        Methodology::Pomodoro,
        Methodology::DeepWork,
        Methodology::MakeTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::Pomodoro => "pomodoro",
            Methodology::DeepWork => "deep_work",
            Methodology::MakeTime => "make_time",
        }
    }
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Methodology {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pomodoro" => Ok(Methodology::Pomodoro),
            "deep_work" | "deepwork" => Ok(Methodology::DeepWork),
            "make_time" | "maketime" => Ok(Methodology::MakeTime),
            _ => Err(CoreError::InvalidMethodology(s.to_string())),
        }
    }
}

/// A named duration choice offered when starting work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub label: &'static str,
    pub minutes: u32,
}

impl Preset {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }
}

/// Recommended break following a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPlan {
    pub kind: SessionKind,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    /// Work presets in minutes: classic, quick, extended.
    #[serde(default = "default_pomodoro_presets")]
    pub presets: [u32; 3],
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepWorkConfig {
    /// Work presets in minutes: full, standard, light.
    #[serde(default = "default_deep_work_presets")]
    pub presets: [u32; 3],
    #[serde(default = "default_deep_work_break")]
    pub break_duration: u32,
    /// Daily deep work minutes needed to extend the streak.
    #[serde(default = "default_streak_threshold")]
    pub streak_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeTimeConfig {
    /// Work presets in minutes: highlight, sprint, quick.
    #[serde(default = "default_make_time_presets")]
    pub presets: [u32; 3],
    #[serde(default = "default_make_time_break")]
    pub break_duration: u32,
    #[serde(default = "default_true")]
    pub laser_checklist: bool,
}

fn default_pomodoro_presets() -> [u32; 3] {
    [25, 15, 50]
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_deep_work_presets() -> [u32; 3] {
    [90, 50, 25]
}
fn default_deep_work_break() -> u32 {
    20
}
fn default_streak_threshold() -> u32 {
    60
}
fn default_make_time_presets() -> [u32; 3] {
    [60, 45, 30]
}
fn default_make_time_break() -> u32 {
    15
}
fn default_true() -> bool {
    true
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            presets: default_pomodoro_presets(),
            short_break: default_short_break(),
            long_break: default_long_break(),
        }
    }
}

impl Default for DeepWorkConfig {
    fn default() -> Self {
        Self {
            presets: default_deep_work_presets(),
            break_duration: default_deep_work_break(),
            streak_threshold: default_streak_threshold(),
        }
    }
}

impl Default for MakeTimeConfig {
    fn default() -> Self {
        Self {
            presets: default_make_time_presets(),
            break_duration: default_make_time_break(),
            laser_checklist: true,
        }
    }
}

/// A methodology together with its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodologyPolicy {
    Pomodoro(PomodoroConfig),
    DeepWork(DeepWorkConfig),
    MakeTime(MakeTimeConfig),
}

impl MethodologyPolicy {
    /// Policy with built-in defaults.
    pub fn default_for(methodology: Methodology) -> Self {
        match methodology {
            Methodology::Pomodoro => Self::Pomodoro(PomodoroConfig::default()),
            Methodology::DeepWork => Self::DeepWork(DeepWorkConfig::default()),
            Methodology::MakeTime => Self::MakeTime(MakeTimeConfig::default()),
        }
    }

    pub fn methodology(&self) -> Methodology {
        match self {
            Self::Pomodoro(_) => Methodology::Pomodoro,
            Self::DeepWork(_) => Methodology::DeepWork,
            Self::MakeTime(_) => Methodology::MakeTime,
        }
    }

    pub fn presets(&self) -> [Preset; 3] {
        let (labels, minutes) = match self {
            Self::Pomodoro(c) => (["Classic", "Quick", "Extended"], c.presets),
            Self::DeepWork(c) => (["Full block", "Standard", "Light"], c.presets),
            Self::MakeTime(c) => (["Highlight", "Sprint", "Quick"], c.presets),
        };
        [0, 1, 2].map(|i| Preset {
            label: labels[i],
            minutes: minutes[i],
        })
    }

    /// First preset; used when a work session starts without a duration.
    pub fn default_work_duration(&self) -> Duration {
        self.presets()[0].duration()
    }

    pub fn short_break(&self) -> Duration {
        let minutes = match self {
            Self::Pomodoro(c) => c.short_break,
            Self::DeepWork(c) => c.break_duration,
            Self::MakeTime(c) => c.break_duration,
        };
        break_minutes(minutes)
    }

    /// Equal to [`short_break`](Self::short_break) for single-break methodologies.
    pub fn long_break(&self) -> Duration {
        match self {
            Self::Pomodoro(c) => break_minutes(c.long_break),
            Self::DeepWork(_) | Self::MakeTime(_) => self.short_break(),
        }
    }

    /// Zero when the methodology has no short/long distinction.
    pub fn sessions_before_long_break(&self) -> u32 {
        match self {
            Self::Pomodoro(_) => POMODORO_SESSIONS_BEFORE_LONG_BREAK,
            Self::DeepWork(_) | Self::MakeTime(_) => 0,
        }
    }

    pub fn break_plan(&self, completed_work_today: u32) -> BreakPlan {
        select_break(
            completed_work_today,
            self.sessions_before_long_break(),
            self.short_break(),
            self.long_break(),
        )
    }

    pub fn uses_highlight(&self) -> bool {
        matches!(self, Self::MakeTime(_))
    }

    pub fn uses_checklist(&self) -> bool {
        matches!(self, Self::MakeTime(c) if c.laser_checklist)
    }

    /// Prompts to show before starting, empty when the checklist is off.
    pub fn checklist(&self) -> &'static [&'static str] {
        if self.uses_checklist() {
            &LASER_CHECKLIST
        } else {
            &[]
        }
    }

    pub fn supports_shutdown_ritual(&self) -> bool {
        matches!(self, Self::DeepWork(_))
    }

    pub fn supports_distraction_log(&self) -> bool {
        matches!(self, Self::DeepWork(_))
    }

    /// Focus score and energize activity are asked for after each session.
    pub fn records_focus_score(&self) -> bool {
        matches!(self, Self::MakeTime(_))
    }

    /// Streak threshold for deep work days, if the methodology tracks one.
    pub fn streak_threshold(&self) -> Option<Duration> {
        match self {
            Self::DeepWork(c) => Some(Duration::minutes(i64::from(c.streak_threshold))),
            Self::Pomodoro(_) | Self::MakeTime(_) => None,
        }
    }

    /// Question asked about the intended outcome of a session, if any.
    pub fn outcome_prompt(&self) -> Option<&'static str> {
        match self {
            Self::Pomodoro(_) => None,
            Self::DeepWork(_) => Some("What will be true when this block is done?"),
            Self::MakeTime(_) => Some("What does finishing today's highlight look like?"),
        }
    }

    pub fn task_prompt(&self) -> &'static str {
        match self {
            Self::Pomodoro(_) => "What are you working on?",
            Self::DeepWork(_) => "Which cognitively demanding task deserves this block?",
            Self::MakeTime(_) => "What is today's highlight?",
        }
    }
}

/// Pick the break kind and length after `completed_work_today` work sessions.
///
/// Every `sessions_before_long`-th session earns a long break; before any
/// work is done the break is short. A zero interval never yields a long
/// break.
pub fn select_break(
    completed_work_today: u32,
    sessions_before_long: u32,
    short: Duration,
    long: Duration,
) -> BreakPlan {
    let is_long = sessions_before_long > 0
        && completed_work_today > 0
        && completed_work_today % sessions_before_long == 0;
    if is_long {
        BreakPlan {
            kind: SessionKind::LongBreak,
            duration: long,
        }
    } else {
        BreakPlan {
            kind: SessionKind::ShortBreak,
            duration: short,
        }
    }
}

fn break_minutes(minutes: u32) -> Duration {
    Duration::minutes(i64::from(minutes.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methodology_parses_common_spellings() {
        assert_eq!("pomodoro".parse::<Methodology>().unwrap(), Methodology::Pomodoro);
        assert_eq!("Deep-Work".parse::<Methodology>().unwrap(), Methodology::DeepWork);
        assert_eq!("deepwork".parse::<Methodology>().unwrap(), Methodology::DeepWork);
        assert_eq!("make time".parse::<Methodology>().unwrap(), Methodology::MakeTime);
        assert!(matches!(
            "kanban".parse::<Methodology>(),
            Err(CoreError::InvalidMethodology(name)) if name == "kanban"
        ));
    }

    #[test]
    fn methodology_display_roundtrips() {
        for m in Methodology::ALL {
            assert_eq!(m.to_string().parse::<Methodology>().unwrap(), m);
        }
    }

    #[test]
    fn every_fourth_pomodoro_gets_long_break() {
        let policy = MethodologyPolicy::default_for(Methodology::Pomodoro);
        for count in 0..=12u32 {
            let plan = policy.break_plan(count);
            let expect_long = count > 0 && count % 4 == 0;
            assert_eq!(plan.kind == SessionKind::LongBreak, expect_long, "count {count}");
            let expected = if expect_long { 15 } else { 5 };
            assert_eq!(plan.duration, Duration::minutes(expected));
        }
    }

    #[test]
    fn pomodoro_interval_ignores_configuration() {
        let policy = MethodologyPolicy::Pomodoro(PomodoroConfig {
            presets: [30, 20, 60],
            short_break: 7,
            long_break: 25,
        });
        assert_eq!(policy.sessions_before_long_break(), 4);
        assert_eq!(policy.break_plan(4).duration, Duration::minutes(25));
        assert_eq!(policy.break_plan(3).duration, Duration::minutes(7));
    }

    #[test]
    fn single_break_methodologies_always_short_and_nonzero() {
        let policy = MethodologyPolicy::DeepWork(DeepWorkConfig {
            break_duration: 0,
            ..DeepWorkConfig::default()
        });
        for count in 0..10 {
            let plan = policy.break_plan(count);
            assert_eq!(plan.kind, SessionKind::ShortBreak);
            assert!(plan.duration > Duration::zero());
        }
        assert_eq!(policy.short_break(), policy.long_break());
    }

    #[test]
    fn presets_follow_methodology() {
        let deep = MethodologyPolicy::default_for(Methodology::DeepWork);
        assert_eq!(deep.default_work_duration(), Duration::minutes(90));
        let minutes: Vec<u32> = deep.presets().iter().map(|p| p.minutes).collect();
        assert_eq!(minutes, vec![90, 50, 25]);

        let pomodoro = MethodologyPolicy::default_for(Methodology::Pomodoro);
        assert_eq!(pomodoro.default_work_duration(), Duration::minutes(25));
    }

    #[test]
    fn capabilities_per_methodology() {
        let make_time = MethodologyPolicy::default_for(Methodology::MakeTime);
        assert!(make_time.uses_highlight());
        assert!(make_time.records_focus_score());
        assert_eq!(make_time.checklist().len(), LASER_CHECKLIST.len());

        let off = MethodologyPolicy::MakeTime(MakeTimeConfig {
            laser_checklist: false,
            ..MakeTimeConfig::default()
        });
        assert!(off.checklist().is_empty());

        let deep = MethodologyPolicy::default_for(Methodology::DeepWork);
        assert!(deep.supports_shutdown_ritual());
        assert!(!deep.uses_highlight());
        assert_eq!(deep.streak_threshold(), Some(Duration::minutes(60)));

        let pomodoro = MethodologyPolicy::default_for(Methodology::Pomodoro);
        assert!(pomodoro.outcome_prompt().is_none());
        assert!(pomodoro.checklist().is_empty());
    }
}
