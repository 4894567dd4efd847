//! Shared utilities for the commands

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use spendflow_core::{find_project_root, Ledger, Settings};

/// Open the ledger at `root`, or at the nearest parent directory with a `.env`
pub fn open_ledger(root: Option<&Path>) -> Result<Ledger> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            find_project_root(&cwd).context("Could not locate the project root; pass --root")?
        }
    };

    let settings = Settings::from_env(&root);
    Ledger::new(settings).with_context(|| format!("Failed to open ledger at {}", root.display()))
}

/// Colored money amount: red for outflows, green for inflows
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m-€{:.2}\x1b[0m", amount.abs())
    } else {
        format!("\x1b[32m+€{:.2}\x1b[0m", amount)
    }
}

/// Date as shown in listings; undated rows get a placeholder
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "????-??-??".to_string(),
    }
}
