//! Mailguard CLI - run jobs by hand and inspect state.
//!
//! # Usage
//!
//! ```bash
//! # Suppress marketing email for tagged customers now
//! mg-cli suppress
//!
//! # Put suppressed emails back
//! mg-cli restore
//!
//! # Tag customers billed on a given day (default: today)
//! mg-cli tag-due --date 2025-06-30
//!
//! # Untag customers no longer due
//! mg-cli untag-expired
//!
//! # Show pending suppressions and billing entries
//! mg-cli status --state-dir data
//! ```
//!
//! Job commands read the same environment as the worker. Do not run them
//! while the worker is running: the run flag is per process.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mg-cli")]
#[command(author, version, about = "Mailguard operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the email of every tagged customer with a synthetic address
    Suppress,
    /// Restore every suppressed customer's original email
    Restore,
    /// Tag customers whose billing date is today
    TagDue {
        /// Billing date to tag for (YYYY-MM-DD, default: today in the configured timezone)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Untag customers whose billing date is not today
    UntagExpired {
        /// Day to treat as today (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show pending suppressions and billing entries
    Status {
        /// Directory holding the state files
        #[arg(long, env = "MAILGUARD_STATE_DIR", default_value = "data")]
        state_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Suppress => commands::jobs::suppress().await,
        Commands::Restore => commands::jobs::restore().await,
        Commands::TagDue { date } => commands::jobs::tag_due(date).await,
        Commands::UntagExpired { date } => commands::jobs::untag_expired(date).await,
        Commands::Status { state_dir } => commands::status::show(&state_dir).await.map(|_| ()),
    }
}
