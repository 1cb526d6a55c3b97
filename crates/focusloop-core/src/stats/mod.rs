//! Statistics module for focusloop
//!
//! Read-only aggregation over the session log: daily and period summaries,
//! per-methodology breakdowns, the deep work streak, hour-of-day
//! productivity and energize-activity correlations.
//!
//! Only Completed sessions count. Cancelled and Voided sessions stay in the
//! log but never contribute to a total.

mod aggregate;
mod engine;

pub use aggregate::{
    completed_work_count, daily_stats, deep_work_duration, deep_work_streak, energize_stats,
    hourly_productivity, local_day_bounds, period_stats, DailyStats, EnergizeStat,
    HourlyProductivity, MethodologyBreakdown, PeriodStats, MAX_STREAK_DAYS,
};
pub use engine::{Analytics, MAX_LOOKBACK_DAYS};
