//! Statement normalization for semicolon-delimited bank exports
//!
//! Export header (columns after `Balance` vary between exports):
//! `Accountnumber;Heading;Name;Currency;Date;Description;Value date;Amount;Balance;Credit;Debit;Counterparty account number;...`

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::config::AccountSuffixes;
use crate::error::{Error, Result};
use crate::models::{Transaction, GENERAL_SENDER, SAVINGS_SENDER};

/// Date format used by the bank exports
pub const DATE_FORMAT: &str = "%d/%m/%Y";

const RENAMES: &[(&str, &str)] = &[
    ("Accountnumber", "sender"),
    ("Counterparty account number", "recipient"),
];

const DROPPED: &[&str] = &[
    "Heading",
    "Name",
    "Currency",
    "Value date",
    "Credit",
    "Debit",
    "Counterparty BIC",
    "Counterparty name",
    "Counterparty address",
    "Standard-format reference",
    "Free-format reference",
];

const REQUIRED: &[&str] = &["date", "sender", "recipient", "description", "amount", "balance"];

/// Read and normalize the pending statement files from `raw_dir`
///
/// Only `.csv` files are read. The usable column count is taken from the
/// first one's header. Output is sorted by date (stable, undated rows last).
pub fn normalize_batch(
    raw_dir: &Path,
    files: &[String],
    accounts: &AccountSuffixes,
) -> Result<Vec<Transaction>> {
    let mut column_count: Option<usize> = None;
    let mut batch = Vec::new();

    for name in files.iter().filter(|f| is_csv(f)) {
        let path = raw_dir.join(name);
        let file = File::open(&path)?;
        let (ncols, rows) = parse_statement(file, name, column_count, accounts)?;
        column_count.get_or_insert(ncols);
        debug!("Read {} rows from {}", rows.len(), name);
        batch.extend(rows);
    }

    sort_by_date(&mut batch);
    info!("Normalized {} transactions", batch.len());
    Ok(batch)
}

fn is_csv(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Stable sort by date with undated rows last
pub fn sort_by_date(batch: &mut [Transaction]) {
    batch.sort_by_key(|t| (t.date.is_none(), t.date));
}

/// Parse one export
///
/// `column_count` restricts parsing to the leading columns; `None` takes
/// every column of this file's header. Returns the column count used along
/// with the rows, in file order.
pub fn parse_statement<R: Read>(
    reader: R,
    source: &str,
    column_count: Option<usize>,
    accounts: &AccountSuffixes,
) -> Result<(usize, Vec<Transaction>)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let ncols = column_count.unwrap_or(headers.len());
    if headers.len() < ncols {
        return Err(Error::Schema(format!(
            "{} has {} columns, expected at least {}",
            source,
            headers.len(),
            ncols
        )));
    }

    let columns = canonical_columns(headers.iter().take(ncols));
    let index = |name: &str| -> Result<usize> {
        columns.get(name).copied().ok_or_else(|| {
            Error::Schema(format!("{} is missing required column '{}'", source, name))
        })
    };
    let [date_idx, sender_idx, recipient_idx, description_idx, amount_idx, balance_idx] = [
        index(REQUIRED[0])?,
        index(REQUIRED[1])?,
        index(REQUIRED[2])?,
        index(REQUIRED[3])?,
        index(REQUIRED[4])?,
        index(REQUIRED[5])?,
    ];

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // Line 1 is the header
        let line = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let raw_date = field(date_idx);
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).ok();
        if date.is_none() {
            warn!("{} line {}: unparseable date '{}'", source, line, raw_date);
        }

        let amount = parse_decimal(field(amount_idx)).ok_or_else(|| {
            Error::Parse(format!(
                "{} line {}: invalid amount '{}'",
                source,
                line,
                field(amount_idx)
            ))
        })?;
        let balance = parse_decimal(field(balance_idx)).ok_or_else(|| {
            Error::Parse(format!(
                "{} line {}: invalid balance '{}'",
                source,
                line,
                field(balance_idx)
            ))
        })?;

        rows.push(Transaction::new(
            date,
            map_sender(field(sender_idx), accounts),
            field(recipient_idx),
            field(description_idx),
            amount,
            balance,
        ));
    }

    Ok((ncols, rows))
}

/// Canonical name to column index; the first occurrence of a name wins
fn canonical_columns<'a>(headers: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut columns = HashMap::new();
    for (i, header) in headers.enumerate() {
        let header = header.trim();
        if DROPPED.contains(&header) {
            continue;
        }
        let renamed = RENAMES
            .iter()
            .find(|(from, _)| *from == header)
            .map(|(_, to)| *to)
            .unwrap_or(header);
        columns
            .entry(renamed.to_lowercase().replace(' ', "_"))
            .or_insert(i);
    }
    columns
}

/// Parse a number written with a comma decimal separator
///
/// When a comma is present, dots are thousands separators ("1.234,56").
/// Plain "1234.56" is accepted as well.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Replace a raw account number by its canonical label
///
/// The general suffix is checked first; unmatched senders are kept as-is.
pub fn map_sender(raw: &str, accounts: &AccountSuffixes) -> String {
    if !accounts.general.is_empty() && raw.ends_with(&accounts.general) {
        GENERAL_SENDER.to_string()
    } else if !accounts.savings.is_empty() && raw.ends_with(&accounts.savings) {
        SAVINGS_SENDER.to_string()
    } else {
        raw.to_string()
    }
}
