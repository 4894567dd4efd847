//! Domain models for spendflow

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Category assigned when no rule matches
pub const DEFAULT_CONCEPT: &str = "Others";

/// Category of transfers into savings; kept out of expenses in summaries
pub const SAVINGS_CONCEPT: &str = "Savings";

/// Canonical label for the general (current) account
pub const GENERAL_SENDER: &str = "General";

/// Canonical label for the savings account
pub const SAVINGS_SENDER: &str = "Savings";

/// A bank transaction, one row of the processed transaction table
///
/// Column order here is the on-disk column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Booking date; `None` when the raw export had an unparseable date
    pub date: Option<NaiveDate>,
    /// Canonical account label ("General", "Savings") or the raw account number
    pub sender: String,
    /// Counterparty account number
    pub recipient: String,
    pub description: String,
    /// Negative = outflow, positive = inflow
    pub amount: f64,
    /// Running account balance after this transaction
    pub balance: f64,
    #[serde(with = "title_bool")]
    pub is_recurring: bool,
    #[serde(with = "title_bool")]
    pub is_essential: bool,
    /// Category label
    pub concept: String,
}

impl Transaction {
    /// Create an unannotated transaction (no recurrence, default concept)
    pub fn new(
        date: Option<NaiveDate>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        balance: f64,
    ) -> Self {
        Self {
            date,
            sender: sender.into(),
            recipient: recipient.into(),
            description: description.into(),
            amount,
            balance,
            is_recurring: false,
            is_essential: false,
            concept: DEFAULT_CONCEPT.to_string(),
        }
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }
}

/// Booleans stored as `True`/`False`, read case-insensitively
mod title_bool {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean: {}", other))),
        }
    }
}

/// Resampling cadence for the forecast
///
/// Every period is labelled by its last calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    /// Weeks end on Sunday
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Last day of the period containing `date`
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let days_to_sunday = 6 - i64::from(date.weekday().num_days_from_monday());
                date.checked_add_signed(chrono::Duration::days(days_to_sunday))
                    .unwrap_or(date)
            }
            Self::Monthly => last_day_of_month(date.year(), date.month()).unwrap_or(date),
            Self::Quarterly => {
                let quarter_end_month = (date.month() - 1) / 3 * 3 + 3;
                last_day_of_month(date.year(), quarter_end_month).unwrap_or(date)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
        }
    }

    /// End of the period following the one that ends on `period_end`
    pub fn next_period_end(&self, period_end: NaiveDate) -> NaiveDate {
        match period_end.succ_opt() {
            Some(next_day) => self.period_end(next_day),
            None => period_end,
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "daily" => Ok(Self::Daily),
            "w" | "w-sun" | "weekly" => Ok(Self::Weekly),
            "m" | "me" | "monthly" => Ok(Self::Monthly),
            "q" | "qe" | "quarterly" => Ok(Self::Quarterly),
            "y" | "ye" | "a" | "yearly" => Ok(Self::Yearly),
            _ => Err(format!(
                "Unknown frequency: {} (valid: D, W, ME, QE, YE)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-seasonal ARIMA order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl SarimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for SarimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl std::str::FromStr for SarimaOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match parse_order_list(s)?.as_slice() {
            [p, d, q] => Ok(Self::new(*p, *d, *q)),
            _ => Err(format!("Expected three comma-separated values p,d,q: {}", s)),
        }
    }
}

/// Seasonal order (P, D, Q, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// Season length in periods
    pub s: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, s: usize) -> Self {
        Self { p, d, q, s }
    }

    /// No seasonal component
    pub fn none() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.p == 0 && self.d == 0 && self.q == 0
    }
}

impl Default for SeasonalOrder {
    fn default() -> Self {
        Self::new(0, 1, 1, 12)
    }
}

impl std::str::FromStr for SeasonalOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match parse_order_list(s)?.as_slice() {
            [p, d, q, period] => Ok(Self::new(*p, *d, *q, *period)),
            _ => Err(format!(
                "Expected four comma-separated values P,D,Q,s: {}",
                s
            )),
        }
    }
}

fn parse_order_list(s: &str) -> std::result::Result<Vec<usize>, String> {
    s.trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid order component '{}' in {}", part.trim(), s))
        })
        .collect()
}

/// A dated value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A dated confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPoint {
    pub date: NaiveDate,
    pub lower: f64,
    pub upper: f64,
}

/// Diagnostics of a model fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Orders of the model that was actually estimated
    pub order: SarimaOrder,
    pub seasonal: SeasonalOrder,
    /// Estimated coefficients: AR, MA, seasonal AR, seasonal MA (in that order)
    pub params: Vec<f64>,
    /// Innovation variance
    pub sigma2: f64,
    pub iterations: usize,
    /// False when the optimizer stopped on its iteration limit
    pub converged: bool,
}

/// Forecast bundle handed to the presentation layer
///
/// Computed fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub frequency: Frequency,
    /// Resampled balance history
    pub observed_cumulative: Vec<SeriesPoint>,
    /// Forecast amount per future period
    pub period_forecast: Vec<SeriesPoint>,
    /// 95% interval of each period forecast
    pub period_ci: Vec<IntervalPoint>,
    /// Forecast balance trajectory
    pub cumulative_forecast: Vec<SeriesPoint>,
    /// Running sums of the period bounds; not a simultaneous band
    pub cumulative_ci: Vec<IntervalPoint>,
    /// Present when a model was actually fitted
    pub fit: Option<FitSummary>,
}

impl ForecastResult {
    pub fn empty(frequency: Frequency) -> Self {
        Self {
            frequency,
            observed_cumulative: Vec::new(),
            period_forecast: Vec::new(),
            period_ci: Vec::new(),
            cumulative_forecast: Vec::new(),
            cumulative_ci: Vec::new(),
            fit: None,
        }
    }
}
