//! Balance trajectory forecast
//!
//! The account balance is resampled to period ends, turned into per-period
//! amounts, modelled with a seasonal ARIMA and integrated back into a
//! forecast balance trajectory.

mod optimize;
mod sarima;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{
    ForecastResult, Frequency, IntervalPoint, SarimaOrder, SeasonalOrder, SeriesPoint,
    Transaction,
};

pub use optimize::{nelder_mead, Minimum, NelderMeadOptions};
pub use sarima::{FittedSarima, Prediction, Sarima, Z_95};

/// Forecast `horizon` periods of the balance of `transactions`
///
/// Undated transactions are ignored. With fewer than two periods only the
/// observed series is returned. A history too short for the requested model
/// is forecast with the simplest reduction of it that fits.
pub fn forecast(
    transactions: &[Transaction],
    horizon: usize,
    order: SarimaOrder,
    seasonal: SeasonalOrder,
    frequency: Frequency,
) -> Result<ForecastResult> {
    let model = Sarima::new(order, seasonal)?;

    let observed = resample_balance(transactions, frequency);
    let mut result = ForecastResult::empty(frequency);
    if observed.is_empty() {
        debug!("No dated transactions to forecast");
        return Ok(result);
    }
    result.observed_cumulative = observed;

    if horizon == 0 || result.observed_cumulative.len() < 2 {
        debug!(
            "Skipping model fit ({} period(s), horizon {})",
            result.observed_cumulative.len(),
            horizon
        );
        return Ok(result);
    }

    let amounts = period_amounts(&result.observed_cumulative);
    let mut chosen = model;
    while amounts.len() < chosen.min_observations() {
        let Some(simpler) = chosen.simplified() else {
            break;
        };
        chosen = simpler;
    }
    if chosen != model {
        warn!(
            "Only {} {} period(s) of history; SARIMA{} needs at least {}. Falling back to SARIMA{}",
            amounts.len(),
            frequency,
            model,
            model.min_observations(),
            chosen
        );
    }

    let fitted = chosen.fit(&amounts)?;
    let predictions = fitted.forecast(horizon);

    let dates = future_period_ends(
        frequency,
        result.observed_cumulative[result.observed_cumulative.len() - 1].date,
        horizon,
    );
    let last_balance = result.observed_cumulative[result.observed_cumulative.len() - 1].value;

    let (mut level, mut low, mut high) = (last_balance, last_balance, last_balance);
    for (date, p) in dates.into_iter().zip(&predictions) {
        result.period_forecast.push(SeriesPoint {
            date,
            value: p.mean,
        });
        result.period_ci.push(IntervalPoint {
            date,
            lower: p.lower,
            upper: p.upper,
        });

        level += p.mean;
        low += p.lower;
        high += p.upper;
        result.cumulative_forecast.push(SeriesPoint { date, value: level });
        result.cumulative_ci.push(IntervalPoint {
            date,
            lower: low,
            upper: high,
        });
    }
    result.fit = Some(fitted.summary().clone());

    info!(
        "Forecast {} {} period(s) from {} observed",
        horizon,
        frequency,
        result.observed_cumulative.len()
    );
    Ok(result)
}

/// Balance at every period end between the first and last transaction
///
/// The last transaction of a date sets that date's balance; a period takes
/// the latest balance on or before its end.
pub fn resample_balance(transactions: &[Transaction], frequency: Frequency) -> Vec<SeriesPoint> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in transactions {
        if let Some(date) = tx.date {
            daily.insert(date, tx.balance);
        }
    }

    let (first, last) = match (daily.keys().next(), daily.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let end = frequency.period_end(last);
    let mut period = frequency.period_end(first);
    let mut series = Vec::new();
    loop {
        let value = daily
            .range(..=period)
            .next_back()
            .map(|(_, balance)| *balance)
            .unwrap_or(0.0);
        series.push(SeriesPoint {
            date: period,
            value,
        });

        let next = frequency.next_period_end(period);
        if period >= end || next <= period {
            break;
        }
        period = next;
    }
    series
}

/// Change of the cumulative series per period; the first period keeps its level
pub fn period_amounts(cumulative: &[SeriesPoint]) -> Vec<f64> {
    let mut amounts = Vec::with_capacity(cumulative.len());
    let mut previous = 0.0;
    for point in cumulative {
        amounts.push(point.value - previous);
        previous = point.value;
    }
    amounts
}

fn future_period_ends(frequency: Frequency, last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = last;
    for _ in 0..count {
        current = frequency.next_period_end(current);
        dates.push(current);
    }
    dates
}
