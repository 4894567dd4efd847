//! Balance forecast command

use std::sync::Arc;

use anyhow::{Context, Result};
use spendflow_core::{ForecastResult, Frequency, Ledger, SarimaOrder, SeasonalOrder};

use super::format_date;

/// What to forecast
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub sender: String,
    pub horizon: usize,
    pub order: SarimaOrder,
    pub seasonal: SeasonalOrder,
    pub frequency: Frequency,
}

/// Fit the model on a blocking thread and wait for the result
pub async fn run_forecast(ledger: Arc<Ledger>, request: ForecastRequest) -> Result<ForecastResult> {
    let sender = request.sender.clone();
    tokio::task::spawn_blocking(move || {
        ledger.forecast(
            &request.sender,
            request.horizon,
            request.order,
            request.seasonal,
            request.frequency,
        )
    })
    .await
    .context("Forecast task failed")?
    .with_context(|| format!("Failed to forecast {}", sender))
}

pub async fn cmd_forecast(ledger: Arc<Ledger>, request: ForecastRequest, json: bool) -> Result<()> {
    let sender = request.sender.clone();
    let result = run_forecast(ledger, request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.observed_cumulative.is_empty() {
        println!("No dated transactions for {}.", sender);
        return Ok(());
    }

    println!();
    println!("📈 {} balance ({})", sender, result.frequency);
    println!("   ─────────────────────────────────────────────────────────────");
    let recent = result.observed_cumulative.len().saturating_sub(6);
    for point in &result.observed_cumulative[recent..] {
        println!("   {} │ €{:>12.2}", format_date(Some(point.date)), point.value);
    }

    if result.cumulative_forecast.is_empty() {
        println!();
        println!("   At least two periods of history are needed to forecast.");
        return Ok(());
    }

    println!();
    println!("🔮 Forecast (95% interval)");
    println!("   ─────────────────────────────────────────────────────────────");
    for (point, ci) in result.cumulative_forecast.iter().zip(&result.cumulative_ci) {
        println!(
            "   {} │ €{:>12.2} │ €{:.2} … €{:.2}",
            format_date(Some(point.date)),
            point.value,
            ci.lower,
            ci.upper
        );
    }

    if let Some(fit) = &result.fit {
        println!();
        println!(
            "   Model: ({},{},{}) seasonal ({},{},{},{})",
            fit.order.p,
            fit.order.d,
            fit.order.q,
            fit.seasonal.p,
            fit.seasonal.d,
            fit.seasonal.q,
            fit.seasonal.s
        );
        if !fit.converged {
            println!();
            println!(
                "   ⚠️  Model fit did not converge after {} iterations",
                fit.iterations
            );
        }
    }

    Ok(())
}
