//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_ledger, money formatting)
//! - `ingest` - Statement ingestion
//! - `forecast` - Balance forecast
//! - `summary` - Spending breakdown
//! - `transactions` - Transaction listing
//! - `rules` - Categorization rule listing and testing

pub mod core;
pub mod forecast;
pub mod ingest;
pub mod rules;
pub mod summary;
pub mod transactions;

// Re-export command functions for main.rs
pub use self::core::*;
pub use forecast::*;
pub use ingest::*;
pub use rules::*;
pub use summary::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
