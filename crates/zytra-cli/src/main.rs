//! Zytra CLI - Demand analytics and forecasting
//!
//! Usage:
//!   zytra serve --port 8501                Start web server
//!   zytra inspect --file sales.csv         Column types and first rows
//!   zytra forecast --file sales.csv \
//!       --date-column date --value-column sales --horizon 14
//!   zytra config                           Print effective configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zytra_core::ForecastRequest;

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
            no_seed,
        } => commands::cmd_serve(config, host, port, static_dir, no_seed).await,
        Commands::Inspect { file, rows } => commands::cmd_inspect(&file, rows),
        Commands::Forecast {
            file,
            date_column,
            value_column,
            horizon,
            output,
            json,
        } => commands::cmd_forecast(
            &file,
            ForecastRequest {
                date_column,
                value_column,
                horizon: horizon.unwrap_or(config.forecast.default_horizon),
            },
            output.as_deref(),
            json,
        ),
        Commands::Config => commands::cmd_config(&config),
    }
}
