//! Seasonal ARIMA (1,1,1)x(1,1,1,s)
//!
//! The series is differenced once at lag 1 and once at the seasonal lag, then
//! a multiplicative ARMA model is fitted to what remains:
//!
//! ```text
//! (1 - phi B)(1 - PHI B^s) w_t = (1 + theta B)(1 + THETA B^s) e_t
//! ```
//!
//! Coefficients are estimated by conditional sum of squares (pre-sample
//! shocks fixed at zero), minimised with Nelder-Mead. Each coefficient is
//! kept inside (-0.99, 0.99) through a `tanh` reparameterisation, which keeps
//! both polynomials stationary/invertible.

use serde::Serialize;
use tracing::debug;

use super::linalg::{nelder_mead, SimplexOptions};
use super::{future_dates, Forecaster, ModelOutput, Point};
use crate::error::{Error, ModelKind, Result};

/// Bound on every ARMA coefficient
const COEFF_BOUND: f64 = 0.99;

/// Fitted seasonal ARMA coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SarimaParams {
    pub phi: f64,
    pub seasonal_phi: f64,
    pub theta: f64,
    pub seasonal_theta: f64,
    /// Mean squared one-step residual on the differenced series
    pub sigma2: f64,
}

/// Seasonal ARIMA with fixed orders (1,1,1)x(1,1,1,period)
#[derive(Debug, Clone)]
pub struct Sarima {
    period: usize,
}

impl Default for Sarima {
    fn default() -> Self {
        Self::weekly()
    }
}

impl Sarima {
    /// Weekly seasonality on daily data
    pub fn weekly() -> Self {
        Self { period: 7 }
    }

    pub fn with_period(period: usize) -> Self {
        Self {
            period: period.max(2),
        }
    }

    /// Fewest observations the model accepts.
    ///
    /// Differencing consumes `1 + period` points and the remaining series must
    /// cover the longest lag twice over.
    pub fn min_observations(&self) -> usize {
        let ar_span = 1 + self.period;
        1 + self.period + 2 * (ar_span + 1)
    }

    /// Fit on the values and forecast `horizon` steps ahead
    pub fn fit_predict(&self, values: &[f64], horizon: usize) -> Result<(SarimaParams, Vec<f64>)> {
        let required = self.min_observations();
        if values.len() < required {
            return Err(Error::fitting(
                ModelKind::Sarima,
                format!(
                    "need at least {} observations, got {}",
                    required,
                    values.len()
                ),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::fitting(
                ModelKind::Sarima,
                "series contains NaN or infinite values",
            ));
        }

        let s = self.period;
        let z = difference(values, 1);
        let w = difference(&z, s);

        let start = [
            to_unbounded(autocorrelation(&w, 1)),
            to_unbounded(autocorrelation(&w, s)),
            0.0,
            0.0,
        ];
        let objective = |u: &[f64]| {
            let p = to_params(u);
            let residuals = residuals(&w, s, &p);
            let count = residuals.len().saturating_sub(s + 1).max(1);
            residuals.iter().skip(s + 1).map(|e| e * e).sum::<f64>() / count as f64
        };
        let (best, sigma2) = nelder_mead(objective, &start, SimplexOptions::default());

        if !sigma2.is_finite() || sigma2 == f64::MAX {
            return Err(Error::fitting(
                ModelKind::Sarima,
                "conditional sum of squares did not converge",
            ));
        }

        let coeffs = to_params(&best);
        let params = SarimaParams {
            phi: coeffs[0],
            seasonal_phi: coeffs[1],
            theta: coeffs[2],
            seasonal_theta: coeffs[3],
            sigma2,
        };
        debug!(
            phi = params.phi,
            seasonal_phi = params.seasonal_phi,
            theta = params.theta,
            seasonal_theta = params.seasonal_theta,
            sigma2 = params.sigma2,
            "Fitted seasonal ARIMA"
        );

        let forecast = self.project(values, &z, &w, &coeffs, horizon);
        if forecast.iter().any(|v| !v.is_finite()) {
            return Err(Error::fitting(
                ModelKind::Sarima,
                "forecast produced non-finite values",
            ));
        }

        Ok((params, forecast))
    }

    /// Recursive forecast on the differenced scale, then integrated back
    fn project(&self, y: &[f64], z: &[f64], w: &[f64], p: &[f64; 4], horizon: usize) -> Vec<f64> {
        let s = self.period;
        let mut w_ext = w.to_vec();
        let mut e_ext = residuals(w, s, p);
        let mut z_ext = z.to_vec();
        let mut y_last = *y.last().unwrap_or(&0.0);
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = w_ext.len();
            let next = arma_mean(&w_ext, &e_ext, t, s, p);
            w_ext.push(next);
            e_ext.push(0.0);

            let z_next = next + z_ext[z_ext.len() - s];
            z_ext.push(z_next);
            y_last += z_next;
            out.push(y_last);
        }

        out
    }
}

impl Forecaster for Sarima {
    fn model(&self) -> ModelKind {
        ModelKind::Sarima
    }

    fn name(&self) -> &'static str {
        "SARIMA"
    }

    fn forecast(&self, history: &[Point], horizon: usize) -> Result<ModelOutput> {
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        let (_, predicted) = self.fit_predict(&values, horizon)?;

        let last = history
            .last()
            .map(|p| p.date)
            .ok_or_else(|| Error::fitting(ModelKind::Sarima, "empty history"))?;
        let future = future_dates(last, horizon)
            .into_iter()
            .zip(predicted)
            .map(|(date, value)| Point { date, value })
            .collect();

        Ok(ModelOutput {
            future,
            fitted: None,
        })
    }
}

/// Lag-`lag` differences
fn difference(data: &[f64], lag: usize) -> Vec<f64> {
    data.iter()
        .skip(lag)
        .zip(data)
        .map(|(current, previous)| current - previous)
        .collect()
}

fn autocorrelation(data: &[f64], lag: usize) -> f64 {
    let n = data.len();
    if n <= lag {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let var: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
    if var < 1e-12 {
        return 0.0;
    }
    let cov: f64 = (lag..n)
        .map(|i| (data[i] - mean) * (data[i - lag] - mean))
        .sum();
    cov / var
}

fn to_unbounded(coeff: f64) -> f64 {
    (coeff.clamp(-0.9, 0.9) / COEFF_BOUND).atanh()
}

fn to_params(u: &[f64]) -> [f64; 4] {
    [
        COEFF_BOUND * u[0].tanh(),
        COEFF_BOUND * u[1].tanh(),
        COEFF_BOUND * u[2].tanh(),
        COEFF_BOUND * u[3].tanh(),
    ]
}

/// Conditional mean of `w[t]` given everything before it.
///
/// Terms that would reach before the start of the series are dropped.
fn arma_mean(w: &[f64], e: &[f64], t: usize, s: usize, p: &[f64; 4]) -> f64 {
    let [phi, sphi, theta, stheta] = *p;
    let lagged = |series: &[f64], lag: usize| if t >= lag { series[t - lag] } else { 0.0 };

    phi * lagged(w, 1) + sphi * lagged(w, s) - phi * sphi * lagged(w, s + 1)
        + theta * lagged(e, 1)
        + stheta * lagged(e, s)
        + theta * stheta * lagged(e, s + 1)
}

/// One-step residuals; the first `s + 1` are conditioned to zero
fn residuals(w: &[f64], s: usize, p: &[f64; 4]) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in (s + 1)..w.len() {
        e[t] = w[t] - arma_mean(w, &e, t, s, p);
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.5 * i as f64 + [0.0, 5.0, 8.0, 3.0, -2.0, -6.0, -8.0][i % 7])
            .collect()
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0], 1), vec![2.0, 3.0, 4.0]);
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0], 2), vec![5.0, 7.0]);
    }

    #[test]
    fn test_min_observations() {
        assert_eq!(Sarima::weekly().min_observations(), 26);
    }

    #[test]
    fn test_rejects_short_series() {
        let err = Sarima::weekly().fit_predict(&weekly_series(20), 7).unwrap_err();
        assert!(matches!(
            err,
            Error::ForecastFitting {
                model: ModelKind::Sarima,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_nan() {
        let mut data = weekly_series(40);
        data[10] = f64::NAN;
        assert!(Sarima::weekly().fit_predict(&data, 7).is_err());
    }

    #[test]
    fn test_exact_pattern_is_continued() {
        // Linear trend + fixed weekly pattern is annihilated by both differences,
        // so the forecast must continue it exactly.
        let data = weekly_series(60);
        let (_, forecast) = Sarima::weekly().fit_predict(&data, 14).unwrap();
        let expected = weekly_series(74);

        assert_eq!(forecast.len(), 14);
        for (f, e) in forecast.iter().zip(&expected[60..]) {
            assert!((f - e).abs() < 1e-6, "forecast {} expected {}", f, e);
        }
    }

    #[test]
    fn test_noisy_series_forecast_is_finite_and_bounded() {
        // Deterministic pseudo-noise
        let data: Vec<f64> = weekly_series(90)
            .iter()
            .enumerate()
            .map(|(i, v)| v + ((i * 37 % 11) as f64 - 5.0) * 0.8)
            .collect();

        let (params, forecast) = Sarima::weekly().fit_predict(&data, 30).unwrap();
        assert_eq!(forecast.len(), 30);
        assert!(forecast.iter().all(|v| v.is_finite()));
        for coeff in [params.phi, params.seasonal_phi, params.theta, params.seasonal_theta] {
            assert!(coeff.abs() < COEFF_BOUND + 1e-12);
        }
        // Last observation sits near 138
        let mean = forecast.iter().sum::<f64>() / forecast.len() as f64;
        assert!(mean > 110.0 && mean < 210.0, "mean {}", mean);
    }

    #[test]
    fn test_deterministic() {
        let data: Vec<f64> = weekly_series(50)
            .iter()
            .enumerate()
            .map(|(i, v)| v + ((i * 13 % 7) as f64))
            .collect();
        let a = Sarima::weekly().fit_predict(&data, 10).unwrap();
        let b = Sarima::weekly().fit_predict(&data, 10).unwrap();
        assert_eq!(a.1, b.1);
    }
}
