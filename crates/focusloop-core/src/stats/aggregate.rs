//! Pure aggregation functions over slices of sessions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::methodology::Methodology;
use crate::session::{Session, SessionKind, SessionStatus};

/// Upper bound on how far back the streak walk goes.
pub const MAX_STREAK_DAYS: u32 = 3650;

/// Work and break totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Completed work sessions.
    pub work_sessions: u32,
    /// Completed break sessions, short or long.
    pub breaks_taken: u32,
    /// Total completed work in milliseconds.
    pub total_work_ms: u64,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            work_sessions: 0,
            breaks_taken: 0,
            total_work_ms: 0,
        }
    }

    pub fn total_work(&self) -> Duration {
        crate::session::ms_duration(self.total_work_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodologyBreakdown {
    pub sessions: u32,
    pub total_work_ms: u64,
}

/// Summary over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Completed work sessions.
    pub total_sessions: u32,
    pub total_work_ms: u64,
    pub by_methodology: BTreeMap<Methodology, MethodologyBreakdown>,
    /// Mean focus score over completed sessions that carry one.
    pub average_focus_score: Option<f64>,
    pub focus_samples: u32,
    /// Distractions logged in any session started in the range.
    pub distractions: u32,
}

/// How sessions following one recovery activity scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergizeStat {
    pub activity: String,
    pub sessions: u32,
    pub average_focus_score: f64,
}

/// Completed work per local hour of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyProductivity {
    /// Hour (0-23) to milliseconds of work started in that hour. Every hour
    /// is present.
    pub work_ms_by_hour: BTreeMap<u32, u64>,
}

impl HourlyProductivity {
    fn new() -> Self {
        Self {
            work_ms_by_hour: (0..24).map(|h| (h, 0)).collect(),
        }
    }

    pub fn work_at(&self, hour: u32) -> Duration {
        crate::session::ms_duration(self.work_ms_by_hour.get(&hour).copied().unwrap_or(0))
    }

    /// Hour with the most work, if any work was recorded.
    pub fn peak_hour(&self) -> Option<u32> {
        self.work_ms_by_hour
            .iter()
            .filter(|(_, ms)| **ms > 0)
            .max_by_key(|(hour, ms)| (**ms, std::cmp::Reverse(**hour)))
            .map(|(hour, _)| *hour)
    }
}

/// UTC instants bounding the local calendar day `date`.
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start = (local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc();
    (start, start + Duration::days(1))
}

fn is_completed_work(session: &Session) -> bool {
    session.kind == SessionKind::Work && session.status() == SessionStatus::Completed
}

fn work_ms(session: &Session) -> u64 {
    session.actual_duration().num_milliseconds().max(0) as u64
}

fn started_within(session: &Session, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    session.started_at() >= start && session.started_at() < end
}

/// Completed work sessions, optionally restricted to one methodology.
pub fn completed_work_count(sessions: &[Session], methodology: Option<Methodology>) -> u32 {
    sessions
        .iter()
        .filter(|s| is_completed_work(s))
        .filter(|s| methodology.map_or(true, |m| s.methodology == m))
        .count() as u32
}

pub fn daily_stats(sessions: &[Session], date: NaiveDate, offset: FixedOffset) -> DailyStats {
    let (start, end) = local_day_bounds(date, offset);
    let mut stats = DailyStats::empty(date);

    for session in sessions
        .iter()
        .filter(|s| s.status() == SessionStatus::Completed && started_within(s, start, end))
    {
        if session.kind.is_break() {
            stats.breaks_taken += 1;
        } else {
            stats.work_sessions += 1;
            stats.total_work_ms += work_ms(session);
        }
    }
    stats
}

pub fn period_stats(sessions: &[Session], start: DateTime<Utc>, end: DateTime<Utc>) -> PeriodStats {
    let mut stats = PeriodStats {
        start,
        end,
        total_sessions: 0,
        total_work_ms: 0,
        by_methodology: BTreeMap::new(),
        average_focus_score: None,
        focus_samples: 0,
        distractions: 0,
    };
    let mut focus_sum = 0u32;

    for session in sessions.iter().filter(|s| started_within(s, start, end)) {
        stats.distractions += session.distractions.len() as u32;

        if session.status() != SessionStatus::Completed {
            continue;
        }
        if let Some(score) = session.focus_score {
            focus_sum += u32::from(score);
            stats.focus_samples += 1;
        }
        if session.kind == SessionKind::Work {
            let ms = work_ms(session);
            stats.total_sessions += 1;
            stats.total_work_ms += ms;
            let entry = stats.by_methodology.entry(session.methodology).or_default();
            entry.sessions += 1;
            entry.total_work_ms += ms;
        }
    }

    if stats.focus_samples > 0 {
        stats.average_focus_score = Some(f64::from(focus_sum) / f64::from(stats.focus_samples));
    }
    stats
}

/// Completed deep work methodology work on local day `date`.
pub fn deep_work_duration(sessions: &[Session], date: NaiveDate, offset: FixedOffset) -> Duration {
    let (start, end) = local_day_bounds(date, offset);
    let ms: u64 = sessions
        .iter()
        .filter(|s| is_completed_work(s) && s.methodology == Methodology::DeepWork)
        .filter(|s| started_within(s, start, end))
        .map(work_ms)
        .sum();
    crate::session::ms_duration(ms)
}

/// Count consecutive qualifying days ending today.
///
/// `total_for` returns the deep work done on a day. A day qualifies when its
/// total is at least `threshold` and non-zero. Today is never a break: if it
/// does not qualify yet it is skipped. Any earlier day that does not qualify
/// ends the walk.
pub fn deep_work_streak<F>(today: NaiveDate, threshold: Duration, mut total_for: F) -> Result<u32>
where
    F: FnMut(NaiveDate) -> Result<Duration>,
{
    let qualifies = |total: Duration| total >= threshold && total > Duration::zero();

    let mut streak = 0;
    if qualifies(total_for(today)?) {
        streak += 1;
    }

    let mut day = today;
    while streak < MAX_STREAK_DAYS {
        day = match day.pred_opt() {
            Some(d) => d,
            None => break,
        };
        if !qualifies(total_for(day)?) {
            break;
        }
        streak += 1;
    }
    Ok(streak)
}

/// Completed work started at or after `since`, bucketed by the local hour
/// of `started_at` under the offset `offset_at` gives for that instant.
pub fn hourly_productivity(
    sessions: &[Session],
    since: DateTime<Utc>,
    offset_at: impl Fn(DateTime<Utc>) -> FixedOffset,
) -> HourlyProductivity {
    let mut hourly = HourlyProductivity::new();
    for session in sessions
        .iter()
        .filter(|s| is_completed_work(s) && s.started_at() >= since)
    {
        let hour = session.started_at().with_timezone(&offset_at(session.started_at())).hour();
        *hourly.work_ms_by_hour.entry(hour).or_insert(0) += work_ms(session);
    }
    hourly
}

/// Group completed sessions carrying both an energize activity and a focus
/// score by activity. Best average first.
pub fn energize_stats(
    sessions: &[Session],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<EnergizeStat> {
    let mut groups: HashMap<&str, (u32, u32)> = HashMap::new();
    for session in sessions
        .iter()
        .filter(|s| s.status() == SessionStatus::Completed && started_within(s, start, end))
    {
        let (Some(activity), Some(score)) = (session.energize_activity.as_deref(), session.focus_score)
        else {
            continue;
        };
        let activity = activity.trim();
        if activity.is_empty() {
            continue;
        }
        let entry = groups.entry(activity).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u32::from(score);
    }

    let mut stats: Vec<EnergizeStat> = groups
        .into_iter()
        .map(|(activity, (count, sum))| EnergizeStat {
            activity: activity.to_string(),
            sessions: count,
            average_focus_score: f64::from(sum) / f64::from(count),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.average_focus_score
            .total_cmp(&a.average_focus_score)
            .then(b.sessions.cmp(&a.sessions))
            .then_with(|| a.activity.cmp(&b.activity))
    });
    stats
}
