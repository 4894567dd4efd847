//! Spending breakdown command

use anyhow::Result;
use serde_json::json;
use spendflow_core::summary::{expense_distribution, flow_breakdown, monthly_totals};
use spendflow_core::Ledger;

use super::format_amount;

pub fn cmd_summary(ledger: &Ledger, sender: &str, json: bool) -> Result<()> {
    let transactions = ledger.load(sender)?;

    let distribution = expense_distribution(&transactions);
    let months = monthly_totals(&transactions);
    let flow = flow_breakdown(&transactions);

    if json {
        let output = json!({
            "sender": sender,
            "expense_distribution": distribution,
            "monthly_totals": months,
            "flow": flow,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions for {}.", sender);
        return Ok(());
    }

    let total_expenses: f64 = distribution.iter().map(|c| c.total).sum();

    println!();
    println!("💸 Expenses by concept ({})", sender);
    println!("   ─────────────────────────────────────────────────────────────");
    for category in &distribution {
        let share = if total_expenses > 0.0 {
            category.total / total_expenses * 100.0
        } else {
            0.0
        };
        println!(
            "   {:<15} €{:>10.2}  {:>5.1}%",
            category.concept, category.total, share
        );
    }

    println!();
    println!("📅 Monthly net");
    println!("   ─────────────────────────────────────────────────────────────");
    for month in &months {
        println!("   {:<10} {:>20}", month.label, format_amount(month.total));
    }

    println!();
    println!("🔀 Income allocation");
    println!("   ─────────────────────────────────────────────────────────────");
    for link in &flow.links {
        println!("   {} → {}: €{:.2}", link.source, link.target, link.value);
    }

    Ok(())
}
