pub mod config;
pub mod session;
pub mod stats;
pub mod task;

use focusloop_core::{Config, Database, GitCli, SessionScheduler, SystemClock};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Scheduler over the on-disk database and the wall clock.
pub fn open_scheduler() -> Result<SessionScheduler<Database, SystemClock>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;
    Ok(SessionScheduler::new(db, SystemClock, config).with_git(GitCli))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
