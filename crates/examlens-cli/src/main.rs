//! The examlens command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use examlens_core::partition::SolutionFilter;

mod commands;

#[derive(Parser)]
#[command(name = "examlens", version, about = "Exam attempt analytics and reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze saved analysis and solutions payloads
    Analyze {
        /// Analysis report JSON
        #[arg(long)]
        analysis: PathBuf,

        /// Solutions JSON (bare array or {language, solutions})
        #[arg(long)]
        solutions: PathBuf,

        /// Attempt detail JSON, used for exam timing when the report has none
        #[arg(long)]
        attempt: Option<PathBuf>,

        /// Question filter: all, overtime, unattempted
        #[arg(long, default_value = "all")]
        filter: SolutionFilter,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Merge a saved user-attempts payload into an attempt cache file
    Reconcile {
        /// User-attempts JSON (array, keyed map, or wrapped)
        #[arg(long)]
        attempts: PathBuf,

        /// Attempt cache file; created if missing, overwritten with the result
        #[arg(long)]
        cache: PathBuf,

        /// Reference time (RFC 3339 or epoch millis), defaults to now
        #[arg(long)]
        now: Option<String>,

        /// How long cached-only attempts are trusted
        #[arg(long, default_value = "300")]
        trust_window_secs: i64,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Refresh the cached attempt index from the backend
    Sync {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and analyze one attempt from the backend
    Results {
        /// Attempt to load
        #[arg(long)]
        attempt_id: String,

        /// Question filter: all, overtime, unattempted
        #[arg(long, default_value = "all")]
        filter: SolutionFilter,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Start a new attempt at an exam set
    Reattempt {
        /// Exam set to attempt again
        #[arg(long)]
        exam_set_id: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Clear the local attempt cache
    SignOut {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examlens=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            analysis,
            solutions,
            attempt,
            filter,
            format,
        } => commands::analyze::execute(analysis, solutions, attempt, filter, format),
        Commands::Reconcile {
            attempts,
            cache,
            now,
            trust_window_secs,
            format,
        } => commands::reconcile::execute(attempts, cache, now, trust_window_secs, format),
        Commands::Sync { config } => commands::sync::execute(config).await,
        Commands::Results {
            attempt_id,
            filter,
            format,
            config,
        } => commands::results::execute(attempt_id, filter, format, config).await,
        Commands::Reattempt {
            exam_set_id,
            config,
        } => commands::reattempt::execute(exam_set_id, config).await,
        Commands::SignOut { config } => commands::sign_out::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
