//! Seasonal ARIMA(p,d,q)(P,D,Q,s) without trend
//!
//! Model, with `B` the backshift operator:
//!
//! ```text
//! φ(B) Φ(B^s) (1-B)^d (1-B^s)^D y_t = θ(B) Θ(B^s) e_t
//! φ(B) = 1 - φ1 B - ... - φp B^p        θ(B) = 1 + θ1 B + ... + θq B^q
//! ```
//!
//! Coefficients are estimated by conditional sum of squares on the
//! differenced series (pre-sample residuals set to zero), minimised with
//! Nelder–Mead from all-zero coefficients. No stationarity or
//! invertibility constraint is imposed.

use tracing::{debug, warn};

use super::optimize::{nelder_mead, NelderMeadOptions};
use crate::error::{Error, Result};
use crate::models::{FitSummary, SarimaOrder, SeasonalOrder};

/// Two-sided 95% normal quantile
pub const Z_95: f64 = 1.959963984540054;

/// Unfitted model specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sarima {
    order: SarimaOrder,
    seasonal: SeasonalOrder,
}

/// Point forecast with its 95% interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Estimated model together with the data it was fitted on
#[derive(Debug, Clone)]
pub struct FittedSarima {
    spec: Sarima,
    /// Observed series
    history: Vec<f64>,
    /// Residuals aligned with `history`; zero where not defined
    residuals: Vec<f64>,
    /// Integrated AR polynomial, index = lag, `[0] = 1`
    ar_integrated: Vec<f64>,
    /// MA polynomial, index = lag, `[0] = 1`
    ma: Vec<f64>,
    summary: FitSummary,
}

impl Sarima {
    /// Validate the orders; seasonal terms need a season of at least 2
    pub fn new(order: SarimaOrder, seasonal: SeasonalOrder) -> Result<Self> {
        if !seasonal.is_empty() && seasonal.s < 2 {
            return Err(Error::InvalidData(format!(
                "Seasonal period must be at least 2 when seasonal terms are used (got {})",
                seasonal.s
            )));
        }
        Ok(Self { order, seasonal })
    }

    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    pub fn seasonal(&self) -> SeasonalOrder {
        self.seasonal
    }

    /// Season length, zero when there is no seasonal part
    fn season(&self) -> usize {
        if self.seasonal.is_empty() {
            0
        } else {
            self.seasonal.s
        }
    }

    /// Number of estimated coefficients
    pub fn n_params(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    /// Observations lost to differencing
    fn differencing_loss(&self) -> usize {
        self.order.d + self.season() * self.seasonal.d
    }

    /// Highest lag of the AR polynomial
    fn ar_degree(&self) -> usize {
        self.order.p + self.season() * self.seasonal.p
    }

    /// Smallest series length the model can be estimated on
    pub fn min_observations(&self) -> usize {
        self.differencing_loss() + self.ar_degree() + self.n_params() + 1
    }

    /// Next simpler model: seasonal terms go first, then the ARMA terms,
    /// then differencing. `None` for white noise.
    pub fn simplified(&self) -> Option<Sarima> {
        let order = self.order;
        let simpler = if !self.seasonal.is_empty() {
            order
        } else if order.p > 0 || order.q > 0 {
            SarimaOrder::new(0, order.d, 0)
        } else if order.d > 0 {
            SarimaOrder::new(0, 0, 0)
        } else {
            return None;
        };
        Some(Sarima {
            order: simpler,
            seasonal: SeasonalOrder::none(),
        })
    }

    /// Estimate the coefficients on `y`
    pub fn fit(&self, y: &[f64]) -> Result<FittedSarima> {
        if y.len() < self.min_observations() {
            return Err(Error::InvalidData(format!(
                "Need at least {} observations to fit the model, got {}",
                self.min_observations(),
                y.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData("Series contains non-finite values".into()));
        }

        let delta = self.differencing_polynomial();
        let w = apply_filter(&delta, y);
        let k = self.n_params();

        let objective = |params: &[f64]| {
            let (ar, ma) = self.polynomials(params);
            let (sse, n_eff) = css(&ar, &ma, &w);
            sse / n_eff as f64
        };

        let options = NelderMeadOptions::default();
        let min = nelder_mead(objective, &vec![0.0; k], &options);
        if !min.fx.is_finite() {
            return Err(Error::InvalidData(
                "Model fit diverged: objective is not finite".into(),
            ));
        }
        if !min.converged {
            warn!(
                "SARIMA fit did not converge after {} iterations; using best parameters found",
                min.iterations
            );
        }
        debug!(
            "SARIMA fit: params={:?} sigma2={:.4} iterations={}",
            min.x, min.fx, min.iterations
        );

        let (ar, ma) = self.polynomials(&min.x);
        let residuals_w = residuals(&ar, &ma, &w);
        let offset = self.differencing_loss();
        let mut residuals = vec![0.0; y.len()];
        residuals[offset..].copy_from_slice(&residuals_w);

        Ok(FittedSarima {
            spec: *self,
            history: y.to_vec(),
            residuals,
            ar_integrated: poly_mul(&ar, &delta),
            ma,
            summary: FitSummary {
                order: self.order,
                seasonal: self.seasonal,
                params: min.x,
                sigma2: min.fx,
                iterations: min.iterations,
                converged: min.converged,
            },
        })
    }

    /// (1-B)^d (1-B^s)^D
    fn differencing_polynomial(&self) -> Vec<f64> {
        let mut poly = vec![1.0];
        for _ in 0..self.order.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        let s = self.season();
        if s > 0 {
            let mut seasonal_diff = vec![0.0; s + 1];
            seasonal_diff[0] = 1.0;
            seasonal_diff[s] = -1.0;
            for _ in 0..self.seasonal.d {
                poly = poly_mul(&poly, &seasonal_diff);
            }
        }
        poly
    }

    /// AR and MA polynomials for a parameter vector laid out as
    /// `[ar.., ma.., seasonal ar.., seasonal ma..]`
    fn polynomials(&self, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (p, q) = (self.order.p, self.order.q);
        let (sp, sq) = (self.seasonal.p, self.seasonal.q);
        let s = self.season();

        let ar = &params[..p];
        let ma = &params[p..p + q];
        let sar = &params[p + q..p + q + sp];
        let sma = &params[p + q + sp..p + q + sp + sq];

        let ar_poly = lag_polynomial(ar, 1, -1.0);
        let sar_poly = lag_polynomial(sar, s, -1.0);
        let ma_poly = lag_polynomial(ma, 1, 1.0);
        let sma_poly = lag_polynomial(sma, s, 1.0);

        (poly_mul(&ar_poly, &sar_poly), poly_mul(&ma_poly, &sma_poly))
    }
}

impl std::fmt::Display for Sarima {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (o, s) = (self.order, self.seasonal);
        write!(f, "({},{},{})", o.p, o.d, o.q)?;
        if !s.is_empty() {
            write!(f, "({},{},{},{})", s.p, s.d, s.q, s.s)?;
        }
        Ok(())
    }
}

impl FittedSarima {
    pub fn spec(&self) -> &Sarima {
        &self.spec
    }

    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.summary.sigma2
    }

    /// Forecast `steps` values after the end of the fitted series
    pub fn forecast(&self, steps: usize) -> Vec<Prediction> {
        let n = self.history.len();
        let mut y = self.history.clone();
        let mut e = self.residuals.clone();
        y.reserve(steps);
        e.resize(n + steps, 0.0);

        for t in n..n + steps {
            let mut value = 0.0;
            for (lag, a) in self.ar_integrated.iter().enumerate().skip(1) {
                if let Some(prev) = t.checked_sub(lag) {
                    value -= a * y[prev];
                }
            }
            for (lag, m) in self.ma.iter().enumerate().skip(1) {
                if let Some(prev) = t.checked_sub(lag) {
                    value += m * e[prev];
                }
            }
            y.push(value);
        }

        let psi = self.psi_weights(steps);
        let mut cumulative_psi2 = 0.0;
        y[n..]
            .iter()
            .zip(psi)
            .map(|(mean, weight)| {
                cumulative_psi2 += weight * weight;
                let half_width = Z_95 * (self.summary.sigma2 * cumulative_psi2).sqrt();
                Prediction {
                    mean: *mean,
                    lower: mean - half_width,
                    upper: mean + half_width,
                }
            })
            .collect()
    }

    /// MA(∞) weights of the integrated model, ψ0 = 1
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        let mut psi: Vec<f64> = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut weight = self.ma.get(j).copied().unwrap_or(0.0);
            for k in 1..self.ar_integrated.len().min(j + 1) {
                weight -= self.ar_integrated[k] * psi[j - k];
            }
            psi.push(weight);
        }
        psi
    }
}

/// `1 + sign*c1 B^step + sign*c2 B^(2 step) + ...`
fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    if coefs.is_empty() {
        return vec![1.0];
    }
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Apply a lag polynomial to a series, dropping the first `deg` values
fn apply_filter(poly: &[f64], y: &[f64]) -> Vec<f64> {
    let deg = poly.len() - 1;
    (deg..y.len())
        .map(|t| poly.iter().enumerate().map(|(k, c)| c * y[t - k]).sum())
        .collect()
}

/// Conditional residuals of `ar(B) w_t = ma(B) e_t`, aligned with `w`
///
/// Residuals before the AR degree are zero.
fn residuals(ar: &[f64], ma: &[f64], w: &[f64]) -> Vec<f64> {
    let start = ar.len() - 1;
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        let mut value: f64 = ar.iter().enumerate().map(|(k, a)| a * w[t - k]).sum();
        for (j, m) in ma.iter().enumerate().skip(1) {
            if let Some(prev) = t.checked_sub(j) {
                value -= m * e[prev];
            }
        }
        e[t] = value;
    }
    e
}

/// Conditional sum of squares and the number of residuals in it
fn css(ar: &[f64], ma: &[f64], w: &[f64]) -> (f64, usize) {
    let start = ar.len() - 1;
    let e = residuals(ar, ma, w);
    let n_eff = w.len().saturating_sub(start);
    if n_eff == 0 {
        return (f64::INFINITY, 1);
    }
    (e[start..].iter().map(|v| v * v).sum(), n_eff)
}
