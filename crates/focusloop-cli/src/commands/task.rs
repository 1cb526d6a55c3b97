//! Task management commands for CLI.

use clap::Subcommand;
use focusloop_core::Storage;

use super::{open_scheduler, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task ("Write report #writing" extracts tags)
    Add {
        /// Task title, optionally with #tags
        input: String,
        /// Also make it today's highlight
        #[arg(long)]
        highlight: bool,
    },
    /// List tasks
    List {
        /// Only tasks with sessions, most recently worked first
        #[arg(long)]
        recent: Option<usize>,
    },
    /// Show today's highlight, or set it
    Highlight {
        /// Task ID to make today's highlight
        id: Option<String>,
    },
    /// Sessions recorded against a task
    History {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let scheduler = open_scheduler()?;

    match action {
        TaskAction::Add { input, highlight } => {
            let task = scheduler.create_task(&input)?;
            let task = if highlight {
                scheduler.set_highlight(&task.id)?
            } else {
                task
            };
            print_json(&task)?;
        }
        TaskAction::List { recent } => {
            let tasks = match recent {
                Some(limit) => scheduler.recent_tasks(limit)?,
                None => scheduler.storage().list_tasks()?,
            };
            print_json(&tasks)?;
        }
        TaskAction::Highlight { id: Some(id) } => {
            print_json(&scheduler.set_highlight(&id)?)?;
        }
        TaskAction::Highlight { id: None } => {
            print_json(&scheduler.highlight_candidate()?)?;
        }
        TaskAction::History { id } => {
            print_json(&scheduler.session_history(&id)?)?;
        }
    }
    Ok(())
}
