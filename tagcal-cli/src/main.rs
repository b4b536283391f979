mod commands;
mod events;
mod host;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tagcal_core::config::TagcalConfig;
use tagcal_core::recurrence::Frequency;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tagcal")]
#[command(about = "Desktop reminders and recurrence tools for your tagcal events")]
struct Cli {
    /// Use this config file instead of ~/.config/tagcal/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show reminders before the events in an exported event list (JSON)
    Remind {
        /// Path to the event list, e.g. the backend's GET /api/events response
        events: PathBuf,
    },
    /// Translate repeat settings to and from the backend's recurrence fields
    Recurrence {
        #[command(subcommand)]
        action: RecurrenceAction,
    },
    /// Show notification permission, or ask for it
    Permission {
        /// Prompt for permission if it hasn't been decided yet
        #[arg(long)]
        request: bool,
    },
}

#[derive(Subcommand)]
enum RecurrenceAction {
    /// Backend fields -> form settings
    Decode {
        /// Rule string, e.g. "FREQ=WEEKLY"
        #[arg(long)]
        rule: Option<String>,

        /// Recurrence end timestamp, e.g. "2024-01-30T23:59:59"
        #[arg(long)]
        end_date: Option<String>,

        /// Number of occurrences
        #[arg(long)]
        count: Option<u32>,
    },
    /// Form settings -> backend fields
    Encode {
        /// none, daily, weekly or monthly
        #[arg(short, long, default_value = "none")]
        frequency: Frequency,

        /// Last day of the series (YYYY-MM-DD)
        #[arg(long, conflicts_with = "count")]
        until: Option<NaiveDate>,

        /// Stop after this many occurrences
        #[arg(long)]
        count: Option<u32>,

        /// Event start (YYYY-MM-DDTHH:MM:SS); checks the end date comes after it
        #[arg(long)]
        start: Option<NaiveDateTime>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tagcal=info,tagcal_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Remind { events } => {
            let config = load_config(cli.config.as_deref())?;
            commands::remind::run(&config, &events).await
        }
        Commands::Recurrence { action } => match action {
            RecurrenceAction::Decode {
                rule,
                end_date,
                count,
            } => commands::recurrence::decode(rule.as_deref(), end_date.as_deref(), count),
            RecurrenceAction::Encode {
                frequency,
                until,
                count,
                start,
            } => commands::recurrence::encode(frequency, until, count, start),
        },
        Commands::Permission { request } => {
            let config = load_config(cli.config.as_deref())?;
            commands::permission::run(&config, request).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TagcalConfig> {
    let config = match path {
        Some(path) => TagcalConfig::load_from(path)?,
        None => TagcalConfig::load()?,
    };
    Ok(config)
}
