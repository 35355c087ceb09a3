//! CLI argument definitions using clap
//!
//! This module contains the clap structs for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Zytra - Demand analytics and forecasting
#[derive(Parser)]
#[command(name = "zytra")]
#[command(about = "Demand analytics dashboard and forecaster", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Do not create the default admin account
        #[arg(long)]
        no_seed: bool,
    },

    /// Show column types and the first rows of a CSV file
    Inspect {
        /// CSV file to inspect
        #[arg(short, long)]
        file: PathBuf,

        /// Number of rows to show
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// Forecast a value column and print insights
    Forecast {
        /// CSV file with the series
        #[arg(short, long)]
        file: PathBuf,

        /// Column holding the dates
        #[arg(long)]
        date_column: String,

        /// Numeric column to forecast
        #[arg(long)]
        value_column: String,

        /// Days to forecast, 7 to 60 (defaults to config)
        #[arg(long)]
        horizon: Option<usize>,

        /// Write the text report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full forecast as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}
