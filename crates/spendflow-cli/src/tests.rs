//! CLI command tests

use std::fs;
use std::path::Path;
use std::sync::Arc;

use spendflow_core::{
    AccountSuffixes, Frequency, IngestReport, Ledger, SarimaOrder, SeasonalOrder, Settings,
};
use tempfile::TempDir;

use crate::commands::{self, truncate, ForecastRequest};

const HEADER: &str = "Accountnumber;Heading;Name;Currency;Date;Description;Value date;Amount;Balance;Credit;Debit;Counterparty account number";

fn setup_ledger(root: &Path) -> Ledger {
    fs::create_dir_all(root.join("data").join("raw")).unwrap();
    let settings = Settings::new(root).with_accounts(AccountSuffixes::new("1234", "5678"));
    Ledger::new(settings).unwrap()
}

/// Write a statement with one row per month, balance rising by 100 each month
fn write_monthly_statement(root: &Path, name: &str, months: u32) {
    let mut content = String::from(HEADER);
    for m in 0..months {
        let year = 2025 + (m / 12) as i32;
        let month = m % 12 + 1;
        content.push_str(&format!(
            "\nBE001234;;;EUR;05/{:02}/{};DESPES rent;;100,00;{},00;;;BE20",
            month,
            year,
            (m + 1) * 100
        ));
    }
    content.push('\n');
    fs::write(root.join("data").join("raw").join(name), content).unwrap();
}

// ========== Ingest Command Tests ==========

#[test]
fn test_cmd_ingest() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    write_monthly_statement(temp.path(), "2025.csv", 3);

    assert!(commands::cmd_ingest(&ledger, false).is_ok());
    assert_eq!(ledger.load("General").unwrap().len(), 3);

    // Second run finds nothing new
    assert!(commands::cmd_ingest(&ledger, false).is_ok());
    assert_eq!(ledger.ingest(false).unwrap(), IngestReport::NoNewFiles);
}

#[test]
fn test_cmd_ingest_reprocess() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    write_monthly_statement(temp.path(), "2025.csv", 2);

    commands::cmd_ingest(&ledger, false).unwrap();
    commands::cmd_ingest(&ledger, true).unwrap();
    assert_eq!(ledger.load_all().unwrap().len(), 2);
}

#[test]
fn test_cmd_ingest_bad_file_fails() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    fs::write(
        temp.path().join("data").join("raw").join("bad.csv"),
        "Accountnumber;Date\nX;01/01/2026\n",
    )
    .unwrap();

    assert!(commands::cmd_ingest(&ledger, false).is_err());
}

// ========== Query Command Tests ==========

#[test]
fn test_cmd_transactions_list() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    write_monthly_statement(temp.path(), "2025.csv", 3);
    ledger.ingest(false).unwrap();

    assert!(commands::cmd_transactions_list(&ledger, None, 2).is_ok());
    assert!(commands::cmd_transactions_list(&ledger, Some("General"), 20).is_ok());
    assert!(commands::cmd_transactions_list(&ledger, Some("Nobody"), 20).is_ok());
}

#[test]
fn test_cmd_transactions_before_ingest_fails() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    assert!(commands::cmd_transactions_list(&ledger, None, 20).is_err());
}

#[test]
fn test_cmd_summary() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    write_monthly_statement(temp.path(), "2025.csv", 3);
    ledger.ingest(false).unwrap();

    assert!(commands::cmd_summary(&ledger, "General", false).is_ok());
    assert!(commands::cmd_summary(&ledger, "General", true).is_ok());
}

#[test]
fn test_cmd_rules() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());

    assert!(commands::cmd_rules_list(&ledger).is_ok());
    assert!(commands::cmd_rules_test(&ledger, "Carrefour Express").is_ok());
    assert!(commands::cmd_rules_test(&ledger, "nothing matches").is_ok());
}

// ========== Forecast Command Tests ==========

#[tokio::test]
async fn test_run_forecast_linear_growth() {
    let temp = TempDir::new().unwrap();
    let ledger = setup_ledger(temp.path());
    write_monthly_statement(temp.path(), "history.csv", 8);
    ledger.ingest(false).unwrap();

    let request = ForecastRequest {
        sender: "General".to_string(),
        horizon: 2,
        order: SarimaOrder::new(0, 1, 0),
        seasonal: SeasonalOrder::none(),
        frequency: Frequency::Monthly,
    };
    let result = commands::run_forecast(Arc::new(ledger), request)
        .await
        .unwrap();

    // Constant +100 per month continues
    assert_eq!(result.observed_cumulative.len(), 8);
    assert_eq!(result.cumulative_forecast.len(), 2);
    assert!((result.cumulative_forecast[0].value - 900.0).abs() < 1e-9);
    assert!((result.cumulative_forecast[1].value - 1000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cmd_forecast_outputs() {
    let temp = TempDir::new().unwrap();
    let ledger = Arc::new(setup_ledger(temp.path()));
    write_monthly_statement(temp.path(), "history.csv", 4);
    ledger.ingest(false).unwrap();

    let request = ForecastRequest {
        sender: "General".to_string(),
        horizon: 3,
        order: SarimaOrder::default(),
        seasonal: SeasonalOrder::default(),
        frequency: Frequency::Monthly,
    };

    // Four months are too few for the default model; a reduced one is fitted
    let result = commands::run_forecast(ledger.clone(), request.clone())
        .await
        .unwrap();
    assert_eq!(result.observed_cumulative.len(), 4);
    assert_eq!(result.period_forecast.len(), 3);
    assert_eq!(result.period_ci.len(), 3);
    assert_eq!(result.cumulative_forecast.len(), 3);
    assert_eq!(result.cumulative_ci.len(), 3);
    let fit = result.fit.as_ref().unwrap();
    assert_eq!(fit.order, SarimaOrder::new(0, 1, 0));
    assert!(fit.seasonal.is_empty());

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["observed_cumulative"].as_array().unwrap().len(), 4);
    assert_eq!(json["cumulative_forecast"].as_array().unwrap().len(), 3);

    assert!(commands::cmd_forecast(ledger.clone(), request.clone(), false)
        .await
        .is_ok());
    assert!(commands::cmd_forecast(ledger, request, true).await.is_ok());
}

#[tokio::test]
async fn test_run_forecast_single_month_is_observed_only() {
    let temp = TempDir::new().unwrap();
    let ledger = Arc::new(setup_ledger(temp.path()));
    write_monthly_statement(temp.path(), "history.csv", 1);
    ledger.ingest(false).unwrap();

    let request = ForecastRequest {
        sender: "General".to_string(),
        horizon: 3,
        order: SarimaOrder::default(),
        seasonal: SeasonalOrder::default(),
        frequency: Frequency::Monthly,
    };
    let result = commands::run_forecast(ledger, request).await.unwrap();
    assert_eq!(result.observed_cumulative.len(), 1);
    assert!(result.period_forecast.is_empty());
    assert!(result.period_ci.is_empty());
    assert!(result.cumulative_forecast.is_empty());
    assert!(result.cumulative_ci.is_empty());
    assert!(result.fit.is_none());
}

#[tokio::test]
async fn test_cmd_forecast_invalid_season() {
    let temp = TempDir::new().unwrap();
    let ledger = Arc::new(setup_ledger(temp.path()));
    write_monthly_statement(temp.path(), "history.csv", 4);
    ledger.ingest(false).unwrap();

    let request = ForecastRequest {
        sender: "General".to_string(),
        horizon: 3,
        order: SarimaOrder::default(),
        seasonal: SeasonalOrder::new(0, 1, 1, 1),
        frequency: Frequency::Monthly,
    };
    assert!(commands::cmd_forecast(ledger, request, false).await.is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_open_ledger_with_explicit_root() {
    let temp = TempDir::new().unwrap();
    let ledger = commands::open_ledger(Some(temp.path())).unwrap();
    assert_eq!(ledger.settings().base_dir, temp.path());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long description", 10), "a long ...");
    assert_eq!(truncate("épicerie du coin", 8), "épice...");
}

#[test]
fn test_format_amount() {
    assert!(commands::format_amount(-12.5).contains("-€12.50"));
    assert!(commands::format_amount(3.0).contains("+€3.00"));
}

#[test]
fn test_format_date() {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 2, 1);
    assert_eq!(commands::format_date(date), "2026-02-01");
    assert_eq!(commands::format_date(None), "????-??-??");
}
