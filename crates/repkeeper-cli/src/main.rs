use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "repkeeper", version, about = "Repkeeper workout session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Workout session lifecycle
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Exercise list edits
    Exercise {
        #[command(subcommand)]
        action: commands::exercise::ExerciseAction,
    },
    /// Set edits
    Set {
        #[command(subcommand)]
        action: commands::set::SetAction,
    },
    /// Superset pairing
    Superset {
        #[command(subcommand)]
        action: commands::superset::SupersetAction,
    },
    /// Rest timer control
    Rest {
        #[command(subcommand)]
        action: commands::rest::RestAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Finished workouts
    History {
        /// Number of workouts to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Drive the session live, reading commands from stdin
    Watch,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("REPKEEPER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Exercise { action } => commands::exercise::run(action),
        Commands::Set { action } => commands::set::run(action),
        Commands::Superset { action } => commands::superset::run(action),
        Commands::Rest { action } => commands::rest::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::History { limit } => commands::history::run(limit),
        Commands::Watch => commands::watch::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
