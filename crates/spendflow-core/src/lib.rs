//! Spendflow Core Library
//!
//! Pipeline for personal bank-statement exports:
//! - File register for incremental ingestion
//! - Statement normalization (semicolon-delimited bank exports)
//! - Recurring payment detection
//! - Keyword-based categorization rules
//! - Append-only flat-file transaction table
//! - Summary aggregations for flow, distribution and trend views
//! - Seasonal ARIMA forecast of an account's balance trajectory

mod atomic;
pub mod config;
pub mod error;
pub mod forecast;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod recurrence;
pub mod registry;
pub mod rules;
pub mod store;
pub mod summary;

pub use config::{find_project_root, AccountSuffixes, Settings};
pub use error::{Error, Result};
pub use forecast::{forecast, FittedSarima, Prediction, Sarima};
pub use ingest::{IngestReport, Ledger};
pub use models::{
    ForecastResult, Frequency, IntervalPoint, SarimaOrder, SeasonalOrder, SeriesPoint,
    Transaction,
};
pub use recurrence::{flag_recurring, RecurrenceConfig};
pub use registry::{FileRegister, RegisterEntry};
pub use rules::{apply_fixed_rules, CategoryRule, RuleSet};
pub use store::TransactionStore;
pub use summary::{CategoryTotal, FlowBreakdown, FlowLink, MonthlyTotal};
