//! Demand insights
//!
//! Turns a historical series and a forecast into the five fixed statements
//! shown on the dashboard and written to the downloadable report.

pub mod report;

use std::fmt;

use serde::Serialize;

pub use report::{Report, REPORT_FILENAME, REPORT_TITLE};

/// Direction of the forecast relative to history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
}

impl Trend {
    pub fn message(&self) -> &'static str {
        match self {
            Trend::Increasing => "Demand trend is increasing",
            Trend::Decreasing => "Demand trend is decreasing",
        }
    }
}

/// Inventory outlook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    /// Forecast mean exceeds every observed value
    StockOut,
    Sufficient,
}

impl Risk {
    pub fn message(&self) -> &'static str {
        match self {
            Risk::StockOut => "⚠️ High stock-out risk if inventory is not adjusted",
            Risk::Sufficient => "✅ Inventory levels appear sufficient",
        }
    }
}

/// Structured form of the insight statements
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsightSummary {
    pub mean: f64,
    pub max: f64,
    pub forecast_mean: f64,
    pub trend: Trend,
    pub risk: Risk,
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn peak(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

impl InsightSummary {
    /// Summarise history against a forecast.
    ///
    /// Equal means count as decreasing. Empty inputs yield NaN statistics.
    pub fn compute(historical: &[f64], forecast: &[f64]) -> Self {
        let mean = average(historical);
        let max = peak(historical);
        let forecast_mean = average(forecast);

        let trend = if forecast_mean > mean {
            Trend::Increasing
        } else {
            Trend::Decreasing
        };
        let risk = if forecast_mean > max {
            Risk::StockOut
        } else {
            Risk::Sufficient
        };

        Self {
            mean,
            max,
            forecast_mean,
            trend,
            risk,
        }
    }

    /// The five statements, in display order
    pub fn messages(&self) -> Vec<String> {
        vec![
            format!("Average historical demand: {:.2}", self.mean),
            format!("Peak historical demand: {:.2}", self.max),
            format!("Forecasted average demand: {:.2}", self.forecast_mean),
            self.trend.message().to_string(),
            self.risk.message().to_string(),
        ]
    }
}

impl fmt::Display for InsightSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("\n"))
    }
}

/// Insight statements for a series and its forecast
pub fn insights(historical: &[f64], forecast: &[f64]) -> Vec<String> {
    InsightSummary::compute(historical, forecast).messages()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_history_rising_forecast() {
        let result = insights(&[10.0, 10.0, 10.0, 10.0], &[15.0, 15.0]);
        assert_eq!(
            result,
            vec![
                "Average historical demand: 10.00",
                "Peak historical demand: 10.00",
                "Forecasted average demand: 15.00",
                "Demand trend is increasing",
                "⚠️ High stock-out risk if inventory is not adjusted",
            ]
        );
    }

    #[test]
    fn test_falling_forecast_is_sufficient() {
        let result = insights(&[10.0, 20.0, 10.0, 20.0], &[12.0, 12.0, 12.0]);
        assert_eq!(result[0], "Average historical demand: 15.00");
        assert_eq!(result[1], "Peak historical demand: 20.00");
        assert_eq!(result[2], "Forecasted average demand: 12.00");
        assert_eq!(result[3], "Demand trend is decreasing");
        assert_eq!(result[4], "✅ Inventory levels appear sufficient");
    }

    #[test]
    fn test_equal_means_are_decreasing() {
        let summary = InsightSummary::compute(&[5.0, 15.0], &[10.0]);
        assert_eq!(summary.trend, Trend::Decreasing);
        assert_eq!(summary.risk, Risk::Sufficient);
    }

    #[test]
    fn test_above_mean_below_peak() {
        let summary = InsightSummary::compute(&[1.0, 2.0, 30.0], &[20.0]);
        assert_eq!(summary.trend, Trend::Increasing);
        assert_eq!(summary.risk, Risk::Sufficient);
    }

    #[test]
    fn test_always_five_statements() {
        assert_eq!(insights(&[], &[]).len(), 5);
        assert_eq!(insights(&[1.0], &[]).len(), 5);
        let summary = InsightSummary::compute(&[], &[1.0]);
        assert!(summary.mean.is_nan());
        assert!(summary.max.is_nan());
    }

    #[test]
    fn test_rounding() {
        let result = insights(&[1.005, 2.0], &[3.14159]);
        assert_eq!(result[2], "Forecasted average demand: 3.14");
    }
}
