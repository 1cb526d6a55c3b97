//! Session lifecycle and annotation commands.

use chrono::Duration;
use clap::Args;
use focusloop_core::{
    Clock, CoreError, CurrentState, Database, DistractionCategory, HighlightCandidate,
    Methodology, SessionScheduler,
    ShutdownRitual, StartWork, Storage, SystemClock,
};
use serde::Serialize;

use super::{open_scheduler, print_json, CliResult};

#[derive(Args)]
pub struct StartArgs {
    /// Methodology (pomodoro, deep-work, make-time)
    #[arg(long, short)]
    methodology: Option<String>,
    /// Task ID to work on
    #[arg(long)]
    task: Option<String>,
    /// Session length in minutes
    #[arg(long, conflicts_with = "preset")]
    minutes: Option<u32>,
    /// Methodology preset (1-3)
    #[arg(long, short)]
    preset: Option<usize>,
    /// What this session should produce
    #[arg(long)]
    outcome: Option<String>,
    /// Tag for the session (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Do not record git context
    #[arg(long)]
    no_git: bool,
}

#[derive(Args)]
pub struct RitualArgs {
    /// Loose ends reviewed before shutting down
    #[arg(long)]
    review: Option<String>,
    /// First thing to pick up tomorrow
    #[arg(long)]
    plan: Option<String>,
    /// Closing phrase
    #[arg(long)]
    phrase: Option<String>,
    #[arg(long)]
    session: Option<String>,
}

#[derive(Serialize)]
struct StatusView {
    #[serde(flatten)]
    state: CurrentState,
    remaining_ms: Option<i64>,
    progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlight: Option<HighlightCandidate>,
}

type Scheduler = SessionScheduler<Database, SystemClock>;

fn methodology_or_default(
    scheduler: &Scheduler,
    name: Option<String>,
) -> Result<Methodology, CoreError> {
    match name {
        Some(name) => name.parse(),
        None => scheduler.config().default_methodology(),
    }
}

/// Explicit id, else the active session, else the latest one from the last day.
fn target_session(scheduler: &Scheduler, explicit: Option<String>) -> Result<String, CoreError> {
    if let Some(id) = explicit {
        return Ok(id);
    }
    if let Some(active) = scheduler.current_state()?.active_session {
        return Ok(active.id);
    }
    let since = scheduler.clock().now() - Duration::days(1);
    scheduler
        .storage()
        .find_sessions_since(since)?
        .pop()
        .map(|s| s.id)
        .ok_or(CoreError::NoActiveSession)
}

pub fn start(args: StartArgs) -> CliResult {
    let scheduler = open_scheduler()?;
    let methodology = methodology_or_default(&scheduler, args.methodology)?;
    let policy = scheduler.policy(methodology);

    let duration = match (args.minutes, args.preset) {
        (Some(minutes), _) => Some(Duration::minutes(i64::from(minutes))),
        (None, Some(index)) => {
            let preset = index
                .checked_sub(1)
                .and_then(|i| policy.presets().get(i).cloned())
                .ok_or("preset must be 1, 2 or 3")?;
            Some(preset.duration())
        }
        (None, None) => None,
    };

    if policy.uses_checklist() {
        for item in policy.checklist() {
            eprintln!("[ ] {item}");
        }
    }
    if args.task.is_none() {
        eprintln!("{} (--task)", policy.task_prompt());
    }
    if let (None, Some(prompt)) = (&args.outcome, policy.outcome_prompt()) {
        eprintln!("{prompt} (--outcome)");
    }

    let mut request = StartWork::new(methodology).tags(args.tags);
    request.task_id = args.task;
    request.duration = duration;
    request.intended_outcome = args.outcome;
    if !args.no_git {
        request.working_dir = std::env::current_dir().ok();
    }

    let session = scheduler.start_work(request)?;
    print_json(&session)
}

pub fn start_break(methodology: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let methodology = methodology_or_default(&scheduler, methodology)?;
    print_json(&scheduler.start_break(methodology)?)
}

pub fn pause() -> CliResult {
    print_json(&open_scheduler()?.pause()?)
}

pub fn resume() -> CliResult {
    print_json(&open_scheduler()?.resume()?)
}

pub fn stop() -> CliResult {
    let scheduler = open_scheduler()?;
    let session = scheduler.stop()?;
    let policy = scheduler.policy(session.methodology);
    if policy.records_focus_score() {
        eprintln!("rate this session: focusloop score <1-5>");
    }
    if policy.supports_shutdown_ritual() {
        eprintln!("end of day? focusloop ritual --review .. --plan ..");
    }
    print_json(&session)
}

pub fn cancel() -> CliResult {
    print_json(&open_scheduler()?.cancel()?)
}

pub fn void(id: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let session = match id {
        Some(id) => scheduler.void_session(&id)?,
        None => scheduler.void()?,
    };
    print_json(&session)
}

pub fn status() -> CliResult {
    let scheduler = open_scheduler()?;
    let state = scheduler.current_state()?;
    let now = scheduler.clock().now();
    let (remaining_ms, progress) = match &state.active_session {
        Some(session) => (
            Some(session.remaining(now).num_milliseconds()),
            Some(session.progress(now)),
        ),
        None => (None, None),
    };
    let highlight = match scheduler.config().default_methodology() {
        Ok(m) if scheduler.policy(m).uses_highlight() => scheduler.highlight_candidate()?,
        _ => None,
    };
    print_json(&StatusView {
        state,
        remaining_ms,
        progress,
        highlight,
    })
}

pub fn distraction(text: &str, category: Option<String>, session: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let category = category
        .map(|c| c.parse::<DistractionCategory>())
        .transpose()?;
    let id = target_session(&scheduler, session)?;
    print_json(&scheduler.log_distraction(&id, text, category)?)
}

pub fn score(score: u8, session: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let id = target_session(&scheduler, session)?;
    print_json(&scheduler.set_focus_score(&id, score)?)
}

pub fn ritual(args: RitualArgs) -> CliResult {
    let scheduler = open_scheduler()?;
    let id = target_session(&scheduler, args.session)?;
    let ritual = ShutdownRitual {
        pending_review: args.review,
        tomorrow_plan: args.plan,
        closing_phrase: args.phrase,
    };
    print_json(&scheduler.set_shutdown_ritual(&id, ritual)?)
}

pub fn energize(activity: &str, session: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let id = target_session(&scheduler, session)?;
    print_json(&scheduler.set_energize_activity(&id, activity)?)
}

pub fn note(text: &str, accomplishment: bool, session: Option<String>) -> CliResult {
    let scheduler = open_scheduler()?;
    let id = target_session(&scheduler, session)?;
    let updated = if accomplishment {
        scheduler.set_accomplishment(&id, text)?
    } else {
        scheduler.add_notes(&id, text)?
    };
    print_json(&updated)
}
