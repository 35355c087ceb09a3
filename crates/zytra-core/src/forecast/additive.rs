//! Additive trend + seasonality forecaster
//!
//! `y(t) = g(t) + s_weekly(t) + s_yearly(t)`
//!
//! - `g` is piecewise linear with potential changepoints spread over the
//!   first part of the history
//! - seasonal terms are Fourier series in the day number
//!
//! All coefficients come from one regularised least-squares solve. Each
//! coefficient group has a prior scale; the ridge penalty for a group is the
//! residual variance over its squared prior scale, so loose priors barely
//! shrink and tight ones (changepoints) keep the trend smooth.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::linalg::ridge;
use super::{future_dates, Forecaster, ModelOutput, Point};
use crate::error::{Error, ModelKind, Result};

/// Fourier seasonality settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    /// Period in days
    pub period: f64,
    pub order: usize,
    /// Minimum history span (days) before the component is used
    pub min_span_days: i64,
}

/// Model settings
#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveConfig {
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may fall
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Prior scale of the base level and growth rate
    pub trend_prior_scale: f64,
    pub seasonalities: Vec<Seasonality>,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            trend_prior_scale: 5.0,
            seasonalities: vec![
                Seasonality {
                    period: 7.0,
                    order: 3,
                    min_span_days: 14,
                },
                Seasonality {
                    period: 365.25,
                    order: 10,
                    min_span_days: 730,
                },
            ],
        }
    }
}

/// Additive forecaster with fixed settings
#[derive(Debug, Clone, Default)]
pub struct Additive {
    config: AdditiveConfig,
}

/// Maps dates onto model features
struct Design {
    start: NaiveDate,
    span: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
}

impl Design {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span
    }

    fn width(&self) -> usize {
        2 + self.changepoints.len() + self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>()
    }

    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let t = self.scaled_time(date);
        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        for cp in &self.changepoints {
            row.push((t - cp).max(0.0));
        }

        let day = date.num_days_from_ce() as f64;
        for season in &self.seasonalities {
            for k in 1..=season.order {
                let angle = 2.0 * PI * k as f64 * day / season.period;
                row.push(angle.sin());
                row.push(angle.cos());
            }
        }
        row
    }
}

impl Additive {
    pub fn new(config: AdditiveConfig) -> Self {
        Self { config }
    }

    /// Changepoint positions on the scaled time axis.
    ///
    /// Candidates are evenly spaced row indices over the first
    /// `changepoint_range` of the history, skipping the first row.
    fn changepoints(&self, times: &[f64]) -> Vec<f64> {
        let hist_size = (times.len() as f64 * self.config.changepoint_range).floor() as usize;
        let count = self.config.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (hist_size - 1) as f64;
        (1..=count)
            .map(|i| {
                let idx = (last * i as f64 / count as f64).round() as usize;
                times[idx]
            })
            .collect()
    }

    fn penalties(&self, design: &Design, sigma2: f64) -> Vec<f64> {
        let scaled = |prior: f64| sigma2 / (prior * prior);
        let mut penalty = vec![scaled(self.config.trend_prior_scale); 2];
        penalty.extend(
            std::iter::repeat(scaled(self.config.changepoint_prior_scale))
                .take(design.changepoints.len()),
        );
        let seasonal_width = design.width() - penalty.len();
        penalty.extend(
            std::iter::repeat(scaled(self.config.seasonality_prior_scale)).take(seasonal_width),
        );
        penalty
    }

    /// Fit on the history. Returns the design and the coefficients on the
    /// scaled target.
    fn fit(&self, history: &[Point]) -> Result<(Design, Vec<f64>, f64)> {
        if history.len() < 2 {
            return Err(Error::fitting(
                ModelKind::Additive,
                format!("need at least 2 observations, got {}", history.len()),
            ));
        }
        if history.iter().any(|p| !p.value.is_finite()) {
            return Err(Error::fitting(
                ModelKind::Additive,
                "series contains NaN or infinite values",
            ));
        }

        let start = history[0].date;
        let end = history[history.len() - 1].date;
        let span_days = (end - start).num_days();
        if span_days <= 0 {
            return Err(Error::fitting(
                ModelKind::Additive,
                "history covers a single day",
            ));
        }

        let y_scale = history
            .iter()
            .map(|p| p.value.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = history.iter().map(|p| p.value / y_scale).collect();

        let mut design = Design {
            start,
            span: span_days as f64,
            changepoints: Vec::new(),
            seasonalities: self
                .config
                .seasonalities
                .iter()
                .filter(|s| span_days >= s.min_span_days)
                .copied()
                .collect(),
        };
        let times: Vec<f64> = history.iter().map(|p| design.scaled_time(p.date)).collect();
        design.changepoints = self.changepoints(&times);

        let rows: Vec<Vec<f64>> = history.iter().map(|p| design.row(p.date)).collect();
        let singular = || Error::fitting(ModelKind::Additive, "singular design matrix");

        // First pass with a near-zero penalty estimates the noise level
        let loose = vec![1e-6; design.width()];
        let beta = ridge(&rows, &y, &loose).ok_or_else(singular)?;
        let sigma2 = (residual_ss(&rows, &y, &beta) / y.len() as f64).max(1e-4);

        let beta = ridge(&rows, &y, &self.penalties(&design, sigma2)).ok_or_else(singular)?;
        debug!(
            changepoints = design.changepoints.len(),
            seasonal_terms = design.width() - 2 - design.changepoints.len(),
            sigma2,
            "Fitted additive model"
        );

        Ok((design, beta, y_scale))
    }
}

fn dot(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}

fn residual_ss(rows: &[Vec<f64>], y: &[f64], beta: &[f64]) -> f64 {
    rows.iter()
        .zip(y)
        .map(|(row, target)| (target - dot(row, beta)).powi(2))
        .sum()
}

impl Forecaster for Additive {
    fn model(&self) -> ModelKind {
        ModelKind::Additive
    }

    fn name(&self) -> &'static str {
        "Additive"
    }

    fn forecast(&self, history: &[Point], horizon: usize) -> Result<ModelOutput> {
        let (design, beta, y_scale) = self.fit(history)?;
        let predict = |date: NaiveDate| Point {
            date,
            value: dot(&design.row(date), &beta) * y_scale,
        };

        let fitted: Vec<Point> = history.iter().map(|p| predict(p.date)).collect();
        let last = history[history.len() - 1].date;
        let future: Vec<Point> = future_dates(last, horizon).into_iter().map(predict).collect();

        if future.iter().chain(&fitted).any(|p| !p.value.is_finite()) {
            return Err(Error::fitting(
                ModelKind::Additive,
                "prediction produced non-finite values",
            ));
        }

        Ok(ModelOutput {
            future,
            fitted: Some(fitted),
        })
    }
}
