//! Spendflow CLI - Bank statement pipeline
//!
//! Usage:
//!   spendflow ingest               Ingest new files from data/raw
//!   spendflow forecast             Forecast the General account balance
//!   spendflow summary              Spending breakdown
//!   spendflow transactions         Recent transactions
//!   spendflow rules --test DESC    Check which rule categorizes a description

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

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

    let ledger = Arc::new(commands::open_ledger(cli.root.as_deref())?);

    match cli.command {
        Commands::Ingest { reprocess } => commands::cmd_ingest(&ledger, reprocess),
        Commands::Forecast {
            sender,
            horizon,
            order,
            seasonal,
            frequency,
            json,
        } => {
            let request = commands::ForecastRequest {
                sender,
                horizon,
                order,
                seasonal,
                frequency,
            };
            commands::cmd_forecast(ledger, request, json).await
        }
        Commands::Summary { sender, json } => commands::cmd_summary(&ledger, &sender, json),
        Commands::Transactions { sender, limit } => {
            commands::cmd_transactions_list(&ledger, sender.as_deref(), limit)
        }
        Commands::Rules { test } => match test {
            Some(description) => commands::cmd_rules_test(&ledger, &description),
            None => commands::cmd_rules_list(&ledger),
        },
    }
}
