use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "focusloop", version, about = "Focusloop productivity timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a work session
    Start(commands::session::StartArgs),
    /// Start the next break
    Break {
        /// Methodology (pomodoro, deep-work, make-time)
        #[arg(long, short)]
        methodology: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume the paused session
    Resume,
    /// Complete the active session
    Stop,
    /// Abandon the active session
    Cancel,
    /// Exclude a session from statistics
    Void {
        /// Completed session to void instead of the active one
        #[arg(long)]
        id: Option<String>,
    },
    /// Print the current state as JSON
    Status,
    /// Log a distraction against a session
    Distraction {
        text: String,
        /// internal, external or other
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long)]
        session: Option<String>,
    },
    /// Rate focus for a session (1-5)
    Score {
        score: u8,
        #[arg(long)]
        session: Option<String>,
    },
    /// Record the end-of-day shutdown ritual
    Ritual(commands::session::RitualArgs),
    /// Record what you did to recharge before a session
    Energize {
        activity: String,
        #[arg(long)]
        session: Option<String>,
    },
    /// Append notes to a session
    Note {
        text: String,
        /// Record as the session's accomplishment instead
        #[arg(long)]
        accomplishment: bool,
        #[arg(long)]
        session: Option<String>,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("FOCUSLOOP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start(args) => commands::session::start(args),
        Commands::Break { methodology } => commands::session::start_break(methodology),
        Commands::Pause => commands::session::pause(),
        Commands::Resume => commands::session::resume(),
        Commands::Stop => commands::session::stop(),
        Commands::Cancel => commands::session::cancel(),
        Commands::Void { id } => commands::session::void(id),
        Commands::Status => commands::session::status(),
        Commands::Distraction {
            text,
            category,
            session,
        } => commands::session::distraction(&text, category, session),
        Commands::Score { score, session } => commands::session::score(score, session),
        Commands::Ritual(args) => commands::session::ritual(args),
        Commands::Energize { activity, session } => {
            commands::session::energize(&activity, session)
        }
        Commands::Note {
            text,
            accomplishment,
            session,
        } => commands::session::note(&text, accomplishment, session),
        Commands::Task { action } => commands::task::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
