//! Transaction listing command

use anyhow::Result;
use spendflow_core::Ledger;

use super::{format_amount, format_date, truncate};

pub fn cmd_transactions_list(ledger: &Ledger, sender: Option<&str>, limit: usize) -> Result<()> {
    let transactions = match sender {
        Some(sender) => ledger.load(sender)?,
        None => ledger.load_all()?,
    };

    if transactions.is_empty() {
        println!("No transactions found. Drop statement exports in data/raw and run:");
        println!("  spendflow ingest");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    let start = transactions.len().saturating_sub(limit);
    for tx in transactions[start..].iter().rev() {
        let recurring = if tx.is_recurring { "↻" } else { " " };
        println!(
            "   {} │ {:>20} │ {} {:<13} │ {}",
            format_date(tx.date),
            format_amount(tx.amount),
            recurring,
            truncate(&tx.concept, 13),
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}
