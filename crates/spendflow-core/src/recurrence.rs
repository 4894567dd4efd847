//! Recurring payment detection
//!
//! A transaction is recurring when either:
//! - its description starts with the direct-debit marker phrase, or
//! - the previous payment to the same recipient was roughly a month earlier

use std::collections::HashMap;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::Transaction;

/// Recurrence detection configuration
#[derive(Debug, Clone)]
pub struct RecurrenceConfig {
    /// Case-insensitive description prefix that marks a direct debit
    pub marker_prefix: String,
    /// Day gap to the previous payment to the same recipient (inclusive)
    pub gap_days: RangeInclusive<i64>,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            marker_prefix: "european direct debit creditor".to_string(),
            gap_days: 27..=33,
        }
    }
}

/// Recurrence flag for every row of `batch`, in batch order
pub fn flag_recurring(batch: &[Transaction], config: &RecurrenceConfig) -> Vec<bool> {
    let marker = config.marker_prefix.to_lowercase();
    let mut flags: Vec<bool> = batch
        .iter()
        .map(|t| t.description.to_lowercase().starts_with(&marker))
        .collect();

    // Row indices per recipient; undated rows and blank recipients never
    // take part in gap detection
    let mut groups: HashMap<&str, Vec<(NaiveDate, usize)>> = HashMap::new();
    for (i, tx) in batch.iter().enumerate() {
        if let Some(date) = tx.date {
            if !tx.recipient.trim().is_empty() {
                groups.entry(tx.recipient.as_str()).or_default().push((date, i));
            }
        }
    }

    let mut periodic = 0;
    for rows in groups.values_mut() {
        // Stable: same-day rows keep batch order
        rows.sort_by_key(|(date, _)| *date);
        for pair in rows.windows(2) {
            let (prev_date, _) = pair[0];
            let (date, idx) = pair[1];
            if config.gap_days.contains(&(date - prev_date).num_days()) {
                flags[idx] = true;
                periodic += 1;
            }
        }
    }

    debug!(
        "Flagged {} of {} rows as recurring ({} by payment interval)",
        flags.iter().filter(|f| **f).count(),
        batch.len(),
        periodic
    );
    flags
}
