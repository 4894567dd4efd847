//! Flat-file transaction table
//!
//! One comma-delimited CSV with a header row:
//! `date,sender,recipient,description,amount,balance,is_recurring,is_essential,concept`.
//! The table is append-only apart from a full reprocess, and every write
//! replaces the file atomically.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::error::{Error, Result};
use crate::models::Transaction;

/// Processed transaction table at a fixed path
#[derive(Debug, Clone)]
pub struct TransactionStore {
    path: PathBuf,
}

impl TransactionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Every stored row, in stored order
    pub fn load_all(&self) -> Result<Vec<Transaction>> {
        if !self.exists() {
            return Err(Error::NotFound(format!(
                "Transaction table {} (run ingest first)",
                self.path.display()
            )));
        }
        self.read_rows()
    }

    /// Dated rows of one sender, in stored order
    pub fn load(&self, sender: &str) -> Result<Vec<Transaction>> {
        let rows = self.load_all()?;
        let total = rows.len();

        let mut undated = 0;
        let selected: Vec<Transaction> = rows
            .into_iter()
            .filter(|t| t.sender == sender)
            .filter(|t| {
                let dated = t.date.is_some();
                if !dated {
                    undated += 1;
                }
                dated
            })
            .collect();

        if undated > 0 {
            warn!("Skipping {} undated row(s) for sender {}", undated, sender);
        }
        debug!("Loaded {} of {} rows for sender {}", selected.len(), total, sender);
        Ok(selected)
    }

    /// Append `batch` to the table, or replace the table with it on reprocess
    ///
    /// No content deduplication is done; file-level deduplication is the
    /// register's job.
    pub fn append_and_persist(&self, batch: &[Transaction], reprocess: bool) -> Result<usize> {
        let mut rows = if reprocess || !self.exists() {
            Vec::new()
        } else {
            self.read_rows()?
        };
        rows.extend_from_slice(batch);

        self.write_rows(&rows)?;
        if reprocess {
            info!("Replaced {} with {} row(s)", self.path.display(), rows.len());
        } else {
            info!(
                "Appended {} row(s) to {} ({} total)",
                batch.len(),
                self.path.display(),
                rows.len()
            );
        }
        Ok(rows.len())
    }

    fn read_rows(&self) -> Result<Vec<Transaction>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: Transaction = result?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn write_rows(&self, rows: &[Transaction]) -> Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
        if rows.is_empty() {
            wtr.write_record(COLUMNS)?;
        }
        for row in rows {
            wtr.serialize(row)?;
        }
        let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        write_atomic(&self.path, &bytes)
    }
}

/// On-disk column order
pub const COLUMNS: [&str; 9] = [
    "date",
    "sender",
    "recipient",
    "description",
    "amount",
    "balance",
    "is_recurring",
    "is_essential",
    "concept",
];
