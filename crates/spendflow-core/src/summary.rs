//! Aggregations behind the dashboard views
//!
//! - Expense distribution by concept
//! - Net amount per calendar month
//! - Income-to-spending flow (income concepts → Savings/Expenses/Balance → expense concepts)

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{Transaction, SAVINGS_CONCEPT};

pub const EXPENSES_NODE: &str = "Expenses";
pub const BALANCE_NODE: &str = "Balance";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub concept: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// First day of the month
    pub month: NaiveDate,
    /// e.g. "Jan 2026"
    pub label: String,
    /// Net amount (inflows minus outflows)
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: f64,
}

/// Three-layer flow of money
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowBreakdown {
    /// Node labels: income concepts, then Savings/Expenses/Balance, then expense concepts
    pub labels: Vec<String>,
    pub links: Vec<FlowLink>,
}

/// Outflow totals per concept as positive amounts, largest first
pub fn expense_distribution(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals = outflow_totals(transactions, |_| true)
        .into_iter()
        .map(|(concept, total)| CategoryTotal { concept, total })
        .collect::<Vec<_>>();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

/// Net amount per calendar month, oldest first; undated rows are skipped
pub fn monthly_totals(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in transactions {
        let Some(date) = tx.date else { continue };
        if let Some(month) = date.with_day(1) {
            *months.entry(month).or_insert(0.0) += tx.amount;
        }
    }
    months
        .into_iter()
        .map(|(month, total)| MonthlyTotal {
            label: month.format("%b %Y").to_string(),
            month,
            total,
        })
        .collect()
}

/// Split income across savings, expenses and the retained balance
///
/// Each income concept is allocated to Savings and Expenses in proportion to
/// total savings and total expense outflows; what is left goes to Balance.
/// Expenses are then broken down by concept.
pub fn flow_breakdown(transactions: &[Transaction]) -> FlowBreakdown {
    let mut inflows: BTreeMap<String, f64> = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_inflow()) {
        *inflows.entry(tx.concept.clone()).or_insert(0.0) += tx.amount;
    }

    let expenses = outflow_totals(transactions, |t| t.concept != SAVINGS_CONCEPT);
    let total_savings: f64 = outflow_totals(transactions, |t| t.concept == SAVINGS_CONCEPT)
        .values()
        .sum();
    let total_expenses: f64 = expenses.values().sum();
    let total_out = total_savings + total_expenses;

    let mut labels: Vec<String> = inflows.keys().cloned().collect();
    labels.extend([SAVINGS_CONCEPT, EXPENSES_NODE, BALANCE_NODE].map(String::from));
    let detail: Vec<String> = expenses
        .keys()
        .filter(|c| !labels.contains(c))
        .cloned()
        .collect();
    labels.extend(detail);

    let mut links = Vec::new();
    for (concept, income) in &inflows {
        let (to_savings, to_expenses) = if total_out > 0.0 {
            (
                income * total_savings / total_out,
                income * total_expenses / total_out,
            )
        } else {
            (0.0, 0.0)
        };
        let to_balance = (income - to_savings - to_expenses).max(0.0);

        for (target, value) in [
            (SAVINGS_CONCEPT, to_savings),
            (EXPENSES_NODE, to_expenses),
            (BALANCE_NODE, to_balance),
        ] {
            if value > 0.0 {
                links.push(FlowLink {
                    source: concept.clone(),
                    target: target.to_string(),
                    value,
                });
            }
        }
    }

    for (concept, total) in &expenses {
        links.push(FlowLink {
            source: EXPENSES_NODE.to_string(),
            target: concept.clone(),
            value: *total,
        });
    }

    FlowBreakdown { labels, links }
}

/// Absolute outflow per concept for rows passing `keep`
fn outflow_totals(
    transactions: &[Transaction],
    keep: impl Fn(&Transaction) -> bool,
) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_outflow() && keep(t)) {
        *totals.entry(tx.concept.clone()).or_insert(0.0) += -tx.amount;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(y: i32, m: u32, d: u32, amount: f64, concept: &str) -> Transaction {
        let mut t = Transaction::new(
            NaiveDate::from_ymd_opt(y, m, d),
            "General",
            "BE01",
            concept,
            amount,
            0.0,
        );
        t.concept = concept.to_string();
        t
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(2026, 1, 1, 3000.0, "Salary"),
            tx(2026, 1, 2, -1000.0, "Rent"),
            tx(2026, 1, 5, -200.0, "Groceries"),
            tx(2026, 1, 6, -300.0, "Groceries"),
            tx(2026, 1, 7, -500.0, "Savings"),
            tx(2026, 2, 1, 1000.0, "Others"),
        ]
    }

    #[test]
    fn test_expense_distribution() {
        let dist = expense_distribution(&sample());
        let pairs: Vec<(&str, f64)> = dist.iter().map(|c| (c.concept.as_str(), c.total)).collect();
        assert_eq!(
            pairs,
            vec![("Rent", 1000.0), ("Groceries", 500.0), ("Savings", 500.0)]
        );
    }

    #[test]
    fn test_monthly_totals() {
        let mut txns = sample();
        txns.push(tx(2025, 12, 31, -50.0, "Others"));
        let mut undated = tx(2026, 1, 1, -999.0, "Others");
        undated.date = None;
        txns.push(undated);

        let totals = monthly_totals(&txns);
        let rows: Vec<(&str, f64)> = totals.iter().map(|m| (m.label.as_str(), m.total)).collect();
        assert_eq!(rows, vec![("Dec 2025", -50.0), ("Jan 2026", 1000.0), ("Feb 2026", 1000.0)]);
    }

    #[test]
    fn test_flow_breakdown() {
        let flow = flow_breakdown(&sample());
        assert_eq!(
            flow.labels,
            vec!["Others", "Salary", "Savings", "Expenses", "Balance", "Groceries", "Rent"]
        );

        let link = |s: &str, t: &str| {
            flow.links
                .iter()
                .find(|l| l.source == s && l.target == t)
                .map(|l| l.value)
        };
        // Outflows: 500 savings + 1500 expenses = 2000 total
        assert_eq!(link("Salary", "Savings"), Some(750.0));
        assert_eq!(link("Salary", "Expenses"), Some(2250.0));
        assert_eq!(link("Salary", "Balance"), None);
        assert_eq!(link("Others", "Savings"), Some(250.0));
        assert_eq!(link("Others", "Expenses"), Some(750.0));
        assert_eq!(link("Expenses", "Groceries"), Some(500.0));
        assert_eq!(link("Expenses", "Rent"), Some(1000.0));
        assert_eq!(link("Expenses", "Savings"), None);
    }

    #[test]
    fn test_flow_without_outflows_goes_to_balance() {
        let flow = flow_breakdown(&[tx(2026, 1, 1, 100.0, "Salary")]);
        assert_eq!(
            flow.links,
            vec![FlowLink {
                source: "Salary".into(),
                target: "Balance".into(),
                value: 100.0
            }]
        );
    }

    #[test]
    fn test_savings_rule_feeds_savings_node() {
        let rules = crate::rules::RuleSet::default_rules().unwrap();
        let rule = rules.classify("Transfer estalvis").unwrap();
        assert_eq!(rule.concept, SAVINGS_CONCEPT);

        let mut transfer = tx(2026, 1, 3, -400.0, "x");
        transfer.concept = rule.concept.clone();
        let flow = flow_breakdown(&[tx(2026, 1, 1, 1000.0, "Salary"), transfer]);
        assert!(flow
            .links
            .iter()
            .any(|l| l.source == "Salary" && l.target == SAVINGS_CONCEPT && l.value == 1000.0));
        assert!(flow.links.iter().all(|l| l.source != EXPENSES_NODE));
    }
}
