//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spendflow_core::{Frequency, SarimaOrder, SeasonalOrder};

/// Spendflow - Categorize bank statements and forecast your balance
#[derive(Parser)]
#[command(name = "spendflow")]
#[command(about = "Personal bank-statement pipeline with balance forecasting", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project root containing data/ (defaults to the nearest parent with a .env file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest new statement files from data/raw
    Ingest {
        /// Re-read every raw file and rebuild the transaction table
        #[arg(long)]
        reprocess: bool,
    },

    /// Forecast an account's balance
    Forecast {
        /// Account to forecast
        #[arg(short, long, default_value = "General")]
        sender: String,

        /// Number of future periods
        #[arg(long, default_value = "3")]
        horizon: usize,

        /// Non-seasonal order p,d,q
        #[arg(long, default_value = "1,1,1")]
        order: SarimaOrder,

        /// Seasonal order P,D,Q,s
        #[arg(long, default_value = "0,1,1,12")]
        seasonal: SeasonalOrder,

        /// Resampling frequency: D, W, ME, QE, YE
        #[arg(short, long, default_value = "ME")]
        frequency: Frequency,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spending breakdown for an account
    Summary {
        /// Account to summarize
        #[arg(short, long, default_value = "General")]
        sender: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent transactions
    Transactions {
        /// Only show this account (all accounts if omitted)
        #[arg(short, long)]
        sender: Option<String>,

        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show categorization rules
    Rules {
        /// Show which rule categorizes this description
        #[arg(long)]
        test: Option<String>,
    },
}
