//! Demand forecasting
//!
//! A forecast projects two columns of a [`Table`] into a dated series and runs
//! two models over it:
//!
//! - [`Sarima`] - seasonal ARIMA (1,1,1)x(1,1,1,7)
//! - [`Additive`] - piecewise-linear trend plus Fourier seasonality
//!
//! Both must fit; a failure in either aborts the whole forecast.

pub mod additive;
mod linalg;
pub mod sarima;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{parse_date, parse_number, Table};
use crate::error::{Error, ModelKind, Result};

pub use additive::Additive;
pub use sarima::{Sarima, SarimaParams};

/// Shortest forecast horizon in days
pub const MIN_HORIZON: usize = 7;
/// Longest forecast horizon in days
pub const MAX_HORIZON: usize = 60;
pub const DEFAULT_HORIZON: usize = 30;

/// One dated observation or prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

/// What to forecast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub date_column: String,
    pub value_column: String,
    pub horizon: usize,
}

/// Output of a single model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Predictions for the days after the last observation
    pub future: Vec<Point>,
    /// In-sample predictions over the historical dates, when the model has them
    pub fitted: Option<Vec<Point>>,
}

/// A forecasting model over a daily series
pub trait Forecaster: Send + Sync {
    fn model(&self) -> ModelKind;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Fit on `history` (sorted ascending) and predict `horizon` days ahead
    fn forecast(&self, history: &[Point], horizon: usize) -> Result<ModelOutput>;
}

/// Both model outputs for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub historical: Vec<Point>,
    pub sarima: Vec<Point>,
    pub additive: Vec<Point>,
    pub additive_fitted: Vec<Point>,
}

impl ForecastResult {
    pub fn historical_values(&self) -> Vec<f64> {
        self.historical.iter().map(|p| p.value).collect()
    }

    pub fn sarima_values(&self) -> Vec<f64> {
        self.sarima.iter().map(|p| p.value).collect()
    }

    pub fn additive_values(&self) -> Vec<f64> {
        self.additive.iter().map(|p| p.value).collect()
    }
}

/// The `horizon` calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last + Duration::days(offset))
        .collect()
}

fn validate_horizon(horizon: usize) -> Result<()> {
    if !(MIN_HORIZON..=MAX_HORIZON).contains(&horizon) {
        return Err(Error::InvalidInput(format!(
            "Horizon must be between {} and {} days, got {}",
            MIN_HORIZON, MAX_HORIZON, horizon
        )));
    }
    Ok(())
}

/// Project the date and value columns into a series sorted by date.
///
/// Rows missing either cell are dropped. Ties keep their table order.
pub fn prepare_history(table: &Table, date_column: &str, value_column: &str) -> Result<Vec<Point>> {
    let dates = table.column(date_column)?;
    let values = table.column(value_column)?;

    let mut history = Vec::with_capacity(dates.len());
    for (date, value) in dates.into_iter().zip(values) {
        let (Some(date), Some(value)) = (date, value) else {
            continue;
        };
        let date = parse_date(date)?;
        let value = parse_number(value).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Column {} has non-numeric value: {}",
                value_column, value
            ))
        })?;
        history.push(Point { date, value });
    }

    history.sort_by_key(|p| p.date);
    debug!(
        "Prepared {} observations from {} rows",
        history.len(),
        table.len()
    );
    Ok(history)
}

/// Run both models for a request
pub fn run_forecast(table: &Table, request: &ForecastRequest) -> Result<ForecastResult> {
    validate_horizon(request.horizon)?;
    table.column_index(&request.date_column)?;
    table.column_index(&request.value_column)?;

    let historical = prepare_history(table, &request.date_column, &request.value_column)?;

    let sarima = run_model(&Sarima::weekly(), &historical, request.horizon)?;
    let additive = run_model(&Additive::default(), &historical, request.horizon)?;

    info!(
        observations = historical.len(),
        horizon = request.horizon,
        "Forecast complete"
    );

    Ok(ForecastResult {
        historical,
        sarima: sarima.future,
        additive: additive.future,
        additive_fitted: additive.fitted.unwrap_or_default(),
    })
}

fn run_model(model: &dyn Forecaster, history: &[Point], horizon: usize) -> Result<ModelOutput> {
    debug!(model = model.name(), observations = history.len(), "Fitting model");
    model.forecast(history, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load;
    use crate::test_utils::daily_csv;

    fn request(horizon: usize) -> ForecastRequest {
        ForecastRequest {
            date_column: "date".into(),
            value_column: "sales".into(),
            horizon,
        }
    }

    #[test]
    fn test_future_dates() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let dates = future_dates(last, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_horizon_bounds() {
        let table = load(daily_csv(60).as_bytes()).unwrap();
        for horizon in [0, 6, 61] {
            let err = run_forecast(&table, &request(horizon)).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "horizon {}", horizon);
        }
    }

    #[test]
    fn test_unknown_column() {
        let table = load(daily_csv(60).as_bytes()).unwrap();
        let mut req = request(7);
        req.value_column = "revenue".into();
        assert!(matches!(
            run_forecast(&table, &req),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prepare_history_sorts_and_drops_missing() {
        let csv = "date,sales\n2024-01-03,3\n2024-01-01,1\n,9\n2024-01-02,\n2024-01-02,2\n";
        let table = load(csv.as_bytes()).unwrap();
        let history = prepare_history(&table, "date", "sales").unwrap();

        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(history.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_prepare_history_stable_ties() {
        let csv = "date,sales\n2024-01-02,5\n2024-01-01,1\n2024-01-02,7\n";
        let table = load(csv.as_bytes()).unwrap();
        let history = prepare_history(&table, "date", "sales").unwrap();
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 5.0, 7.0]);
    }

    #[test]
    fn test_prepare_history_bad_date() {
        let csv = "date,sales\n2024-01-01,1\nyesterday,2\n";
        let table = load(csv.as_bytes()).unwrap();
        let err = prepare_history(&table, "date", "sales").unwrap_err();
        assert!(matches!(err, Error::InvalidDate(ref v) if v == "yesterday"));
    }

    #[test]
    fn test_prepare_history_non_numeric_value() {
        let csv = "date,sales\n2024-01-01,1\n2024-01-02,lots\n";
        let table = load(csv.as_bytes()).unwrap();
        let err = prepare_history(&table, "date", "sales").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_run_forecast_shapes() {
        let table = load(daily_csv(60).as_bytes()).unwrap();
        let result = run_forecast(&table, &request(7)).unwrap();

        assert_eq!(result.historical.len(), 60);
        assert_eq!(result.sarima.len(), 7);
        assert_eq!(result.additive.len(), 7);
        assert_eq!(result.additive_fitted.len(), 60);

        let last = result.historical.last().unwrap().date;
        assert_eq!(
            result.additive.iter().map(|p| p.date).collect::<Vec<_>>(),
            future_dates(last, 7)
        );
        assert_eq!(
            result.sarima.iter().map(|p| p.date).collect::<Vec<_>>(),
            future_dates(last, 7)
        );
    }

    #[test]
    fn test_too_few_rows_fails_sarima() {
        let table = load(daily_csv(10).as_bytes()).unwrap();
        let err = run_forecast(&table, &request(7)).unwrap_err();
        assert!(matches!(
            err,
            Error::ForecastFitting {
                model: ModelKind::Sarima,
                ..
            }
        ));
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let table = load(daily_csv(45).as_bytes()).unwrap();
        let a = run_forecast(&table, &request(14)).unwrap();
        let b = run_forecast(&table, &request(14)).unwrap();
        assert_eq!(a, b);
    }
}
