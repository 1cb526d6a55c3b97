use chrono::Duration;
use clap::Subcommand;
use focusloop_core::Methodology;
use serde::Serialize;

use super::{open_scheduler, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Summary over the last N days
    Period {
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Consecutive days of deep work
    Streak {
        /// Minutes per day that count (defaults to deep_work.streak_threshold)
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Work by hour of day
    Hourly {
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Focus after each energize activity
    Energize {
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

#[derive(Serialize)]
struct StreakView {
    days: u32,
    threshold_minutes: i64,
}

pub fn run(action: StatsAction) -> CliResult {
    let scheduler = open_scheduler()?;
    let analytics = scheduler.analytics();

    match action {
        StatsAction::Today => {
            print_json(&analytics.today()?)?;
        }
        StatsAction::Period { days } => {
            print_json(&analytics.last_days(days)?)?;
        }
        StatsAction::Streak { threshold } => {
            let threshold = match threshold {
                Some(minutes) => Duration::minutes(i64::from(minutes)),
                None => scheduler
                    .policy(Methodology::DeepWork)
                    .streak_threshold()
                    .unwrap_or_else(|| Duration::minutes(60)),
            };
            print_json(&StreakView {
                days: scheduler.deep_work_streak(threshold)?,
                threshold_minutes: threshold.num_minutes(),
            })?;
        }
        StatsAction::Hourly { days } => {
            print_json(&analytics.hourly_productivity(days)?)?;
        }
        StatsAction::Energize { days } => {
            print_json(&analytics.energize_last_days(days)?)?;
        }
    }
    Ok(())
}
