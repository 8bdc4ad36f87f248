//! EMT arrivals CLI
//!
//! Command-line front end for the EMT open API client: looks up the lines of
//! a bus stop and prints their arrival estimates.

#![allow(clippy::print_stdout)]

mod commands;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use integration_emt::EmtClient;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{OutputFormat, Refresh};
use crate::config::AppConfig;

/// EMT arrivals CLI
#[derive(Parser)]
#[command(name = "emt-cli")]
#[command(author, version, about = "Bus arrival estimates from the EMT Madrid open API", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./emt.toml if present)
    #[arg(short, long, env = "EMT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the lines serving a stop and their arrival estimates
    ///
    /// Example: emt-cli stop 72
    /// Example: emt-cli stop 72 --refresh 5 --interval 30
    Stop {
        /// Stop identifier
        stop_id: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Number of times to refresh the arrival estimates after the first fetch
        #[arg(long, default_value = "0")]
        refresh: u32,

        /// Seconds to wait before each refresh
        #[arg(long, default_value = "30")]
        interval: u64,
    },

    /// Log in and check that the issued access token is active
    TokenCheck,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over `-v`
fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let app_config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let client = EmtClient::connect(app_config.api)
        .await
        .context("connecting to the EMT open API")?;

    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Stop {
            stop_id,
            json,
            refresh,
            interval,
        } => {
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            };
            let refresh = Refresh {
                count: refresh,
                interval: Duration::from_secs(interval),
            };
            commands::show_stop(&client, stop_id, format, refresh, &mut stdout)
                .await
                .with_context(|| format!("fetching stop {stop_id}"))?;
        },

        Commands::TokenCheck => {
            if !commands::check_token(&client, &mut stdout).await? {
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
