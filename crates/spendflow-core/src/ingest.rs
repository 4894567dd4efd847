//! Ingestion pipeline and shared access to the processed data
//!
//! `Ledger` owns the configuration and serializes writers: ingestion holds
//! the write lock for the whole run, loads and forecasts share the read lock.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::forecast;
use crate::models::{ForecastResult, Frequency, SarimaOrder, SeasonalOrder, Transaction};
use crate::normalize::normalize_batch;
use crate::recurrence::RecurrenceConfig;
use crate::registry::{commit, list_pending};
use crate::rules::{apply_fixed_rules, RuleSet};
use crate::store::TransactionStore;

/// Allowed drift between `previous balance + amount` and the reported balance
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq)]
pub enum IngestReport {
    /// Every raw file is already registered; nothing was written
    NoNewFiles,
    Ingested {
        /// Files newly recorded in the register
        files: Vec<String>,
        /// Rows appended to the table
        rows: usize,
        /// Table size after the run
        total_rows: usize,
        recurring: usize,
        /// Rows whose balance does not follow from the previous row
        balance_mismatches: usize,
    },
}

/// Processed transaction data plus the rules used to build it
#[derive(Debug)]
pub struct Ledger {
    settings: Settings,
    rules: RuleSet,
    recurrence: RecurrenceConfig,
    store: TransactionStore,
    lock: RwLock<()>,
}

impl Ledger {
    /// Create a ledger, loading rules from the override path or the defaults
    pub fn new(settings: Settings) -> Result<Self> {
        let rules = RuleSet::load(settings.rules_path.as_deref())?;
        Ok(Self::with_rules(settings, rules, RecurrenceConfig::default()))
    }

    pub fn with_rules(settings: Settings, rules: RuleSet, recurrence: RecurrenceConfig) -> Self {
        let store = TransactionStore::new(settings.transactions_path.clone());
        Self {
            settings,
            rules,
            recurrence,
            store,
            lock: RwLock::new(()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Ingest raw files that are not in the register yet
    ///
    /// With `reprocess`, every raw file is read again, the table is replaced
    /// and the register rebuilt. Nothing is written when parsing fails, so
    /// the failing files are picked up again on the next run.
    pub fn ingest(&self, reprocess: bool) -> Result<IngestReport> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        let (files, register) = list_pending(
            &self.settings.raw_dir,
            &self.settings.register_path,
            reprocess,
        )?;
        if files.is_empty() {
            info!("No new files to process");
            return Ok(IngestReport::NoNewFiles);
        }
        info!("Processing {} new file(s)", files.len());

        let accounts = self.settings.accounts()?;
        let batch = normalize_batch(&self.settings.raw_dir, &files, accounts)?;
        let annotated = apply_fixed_rules(&batch, &self.rules, &self.recurrence);

        let balance_mismatches = check_balances(&annotated);
        if balance_mismatches > 0 {
            warn!(
                "{} row(s) have a balance that does not follow from the previous row",
                balance_mismatches
            );
        }

        let total_rows = self.store.append_and_persist(&annotated, reprocess)?;
        commit(register, &files, &self.settings.register_path)?;

        let recurring = annotated.iter().filter(|t| t.is_recurring).count();
        info!(
            "Ingested {} row(s) from {} file(s), {} recurring",
            annotated.len(),
            files.len(),
            recurring
        );
        Ok(IngestReport::Ingested {
            files,
            rows: annotated.len(),
            total_rows,
            recurring,
            balance_mismatches,
        })
    }

    /// Dated transactions of one sender
    pub fn load(&self, sender: &str) -> Result<Vec<Transaction>> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.store.load(sender)
    }

    /// Every stored row
    pub fn load_all(&self) -> Result<Vec<Transaction>> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.store.load_all()
    }

    /// Forecast the balance trajectory of one sender
    pub fn forecast(
        &self,
        sender: &str,
        horizon: usize,
        order: SarimaOrder,
        seasonal: SeasonalOrder,
        frequency: Frequency,
    ) -> Result<ForecastResult> {
        let transactions = self.load(sender)?;
        forecast::forecast(&transactions, horizon, order, seasonal, frequency)
    }
}

/// Count rows whose balance differs from `previous balance + amount`
///
/// Checked per sender along batch order, skipping undated rows.
pub fn check_balances(batch: &[Transaction]) -> usize {
    let mut last_balance: HashMap<&str, f64> = HashMap::new();
    let mut mismatches = 0;
    for tx in batch.iter().filter(|t| t.date.is_some()) {
        if let Some(previous) = last_balance.get(tx.sender.as_str()) {
            if (previous + tx.amount - tx.balance).abs() > BALANCE_TOLERANCE {
                debug!(
                    "Balance mismatch for {} on {:?}: {:.2} + {:.2} != {:.2}",
                    tx.sender, tx.date, previous, tx.amount, tx.balance
                );
                mismatches += 1;
            }
        }
        last_balance.insert(tx.sender.as_str(), tx.balance);
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountSuffixes;
    use crate::error::Error;
    use crate::registry::FileRegister;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "Accountnumber;Heading;Name;Currency;Date;Description;Value date;Amount;Balance;Credit;Debit;Counterparty account number";

    fn ledger(root: &Path) -> Ledger {
        fs::create_dir_all(root.join("data").join("raw")).unwrap();
        let settings = Settings::new(root).with_accounts(AccountSuffixes::new("1234", "5678"));
        Ledger::new(settings).unwrap()
    }

    fn write_raw(root: &Path, name: &str, rows: &[&str]) {
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        content.push('\n');
        fs::write(root.join("data").join("raw").join(name), content).unwrap();
    }

    #[test]
    fn test_end_to_end_two_rows() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger(temp.path());
        write_raw(
            temp.path(),
            "jan.csv",
            &[
                "BE00001234;;;EUR;01/01/2026;Salary ARHS;;5000,00;5000,00;;;BE10",
                "BE00001234;;;EUR;01/02/2026;DESPES rent;;-1500,00;3500,00;;;BE20",
            ],
        );

        let report = ledger.ingest(false).unwrap();
        match report {
            IngestReport::Ingested {
                files,
                rows,
                total_rows,
                balance_mismatches,
                ..
            } => {
                assert_eq!(files, vec!["jan.csv"]);
                assert_eq!(rows, 2);
                assert_eq!(total_rows, 2);
                assert_eq!(balance_mismatches, 0);
            }
            other => panic!("unexpected report: {:?}", other),
        }

        let rows = ledger.load("General").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].concept, "Rent");
        assert!(rows[1].is_essential);
        assert_eq!(rows[1].amount, -1500.0);
        assert_eq!(rows[1].balance, 3500.0);
        assert_eq!(rows[0].concept, "Salary");

        let register = FileRegister::load(&ledger.settings().register_path).unwrap();
        assert!(register.contains("jan.csv"));

        let result = ledger
            .forecast(
                "General",
                0,
                SarimaOrder::default(),
                SeasonalOrder::default(),
                Frequency::Monthly,
            )
            .unwrap();
        let observed: Vec<_> = result
            .observed_cumulative
            .iter()
            .map(|p| (p.date, p.value))
            .collect();
        assert_eq!(
            observed,
            vec![
                (NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(), 5000.0),
                (NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(), 3500.0),
            ]
        );
        assert!(result.period_forecast.is_empty());
    }

    #[test]
    fn test_second_run_without_new_files() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger(temp.path());
        write_raw(temp.path(), "a.csv", &["X1234;;;;01/01/2026;A;;1,00;1,00;;;BE1"]);

        ledger.ingest(false).unwrap();
        let before = fs::read_to_string(&ledger.settings().transactions_path).unwrap();

        assert_eq!(ledger.ingest(false).unwrap(), IngestReport::NoNewFiles);
        let after = fs::read_to_string(&ledger.settings().transactions_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_registered_file_skipped_even_if_changed() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger(temp.path());
        write_raw(temp.path(), "a.csv", &["X1234;;;;01/01/2026;A;;1,00;1,00;;;BE1"]);
        ledger.ingest(false).unwrap();

        // Same name, different content
        write_raw(
            temp.path(),
            "a.csv",
            &[
                "X1234;;;;01/01/2026;A;;1,00;1,00;;;BE1",
                "X1234;;;;02/01/2026;B;;1,00;2,00;;;BE1",
            ],
        );
        assert_eq!(ledger.ingest(false).unwrap(), IngestReport::NoNewFiles);
        assert_eq!(ledger.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_incremental_append_and_reprocess() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger(temp.path());
        write_raw(temp.path(), "a.csv", &["X1234;;;;01/01/2026;A;;1,00;1,00;;;BE1"]);
        ledger.ingest(false).unwrap();
        write_raw(temp.path(), "b.csv", &["X1234;;;;02/01/2026;B;;1,00;2,00;;;BE1"]);
        ledger.ingest(false).unwrap();
        assert_eq!(ledger.load_all().unwrap().len(), 2);

        let report = ledger.ingest(true).unwrap();
        match report {
            IngestReport::Ingested { files, total_rows, .. } => {
                assert_eq!(files, vec!["a.csv", "b.csv"]);
                assert_eq!(total_rows, 2);
            }
            other => panic!("unexpected report: {:?}", other),
        }
        assert_eq!(ledger.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger(temp.path());
        write_raw(temp.path(), "bad.csv", &["X1234;;;;01/01/2026;A;;oops;1,00;;;BE1"]);

        let err = ledger.ingest(false).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(!ledger.settings().register_path.exists());
        assert!(!ledger.settings().transactions_path.exists());
    }

    #[test]
    fn test_missing_accounts_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("data").join("raw")).unwrap();
        let ledger = Ledger::new(Settings::new(temp.path())).unwrap();

        // No files: accounts are never needed
        assert_eq!(ledger.ingest(false).unwrap(), IngestReport::NoNewFiles);

        write_raw(temp.path(), "a.csv", &["X1234;;;;01/01/2026;A;;1,00;1,00;;;BE1"]);
        assert!(matches!(ledger.ingest(false), Err(Error::Config(_))));
    }

    #[test]
    fn test_check_balances() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 1, d);
        let batch = vec![
            Transaction::new(day(1), "General", "", "", 100.0, 100.0),
            Transaction::new(day(1), "Savings", "", "", 50.0, 50.0),
            Transaction::new(day(2), "General", "", "", -20.0, 80.0),
            Transaction::new(day(3), "General", "", "", -20.0, 70.0),
            Transaction::new(day(3), "Savings", "", "", 10.0, 60.004),
        ];
        assert_eq!(check_balances(&batch), 1);
    }
}
