//! Chart data for the dashboard
//!
//! Charts are plain data; rendering is left to the front end.

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::{parse_date, Table};
use crate::error::Result;
use crate::forecast::{ForecastResult, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
}

/// Horizontal axis value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XValue {
    Date(NaiveDate),
    /// Zero-based row position
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: XValue,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<ChartPoint>,
}

impl Series {
    fn dated(label: &str, points: &[Point]) -> Self {
        Self {
            label: label.to_string(),
            points: points
                .iter()
                .map(|p| ChartPoint {
                    x: XValue::Date(p.date),
                    y: p.value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Chart one numeric column.
///
/// When the table has a non-numeric column, the first one is read as dates and
/// the result is a line chart over them. Otherwise the metric is drawn as bars
/// by row position. Rows with a missing metric or date are skipped.
pub fn metric_chart(table: &Table, metric: &str) -> Result<Chart> {
    let values = table.numeric_column(metric)?;
    let kinds = table.classify_columns();

    let (kind, x_label, xs) = match kinds.other.first() {
        Some(date_column) => {
            let xs = table
                .column(date_column)?
                .into_iter()
                .map(|cell| cell.map(parse_date).transpose())
                .map(|parsed| parsed.map(|d| d.map(XValue::Date)))
                .collect::<Result<Vec<_>>>()?;
            (ChartKind::Line, date_column.clone(), xs)
        }
        None => (
            ChartKind::Bar,
            "index".to_string(),
            (0..table.len()).map(|i| Some(XValue::Index(i))).collect(),
        ),
    };

    let points = xs
        .into_iter()
        .zip(values)
        .filter_map(|(x, y)| Some(ChartPoint { x: x?, y: y? }))
        .collect();

    Ok(Chart {
        kind,
        x_label,
        y_label: metric.to_string(),
        series: vec![Series {
            label: metric.to_string(),
            points,
        }],
    })
}

/// Overlay of history and both forecasts.
///
/// The additive series spans the in-sample fit followed by its forecast.
pub fn forecast_chart(result: &ForecastResult, value_column: &str) -> Chart {
    let mut additive = result.additive_fitted.clone();
    additive.extend_from_slice(&result.additive);

    Chart {
        kind: ChartKind::Line,
        x_label: "date".to_string(),
        y_label: value_column.to_string(),
        series: vec![
            Series::dated("Historical", &result.historical),
            Series::dated("SARIMA", &result.sarima),
            Series::dated("Additive", &additive),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load;
    use crate::error::Error;

    #[test]
    fn test_line_chart_uses_first_text_column() {
        let table = load(b"day,units,store\n2024-01-01,3,a\n2024-01-02,,b\n2024-01-03,5,c\n").unwrap();
        let chart = metric_chart(&table, "units").unwrap();

        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.x_label, "day");
        let points = &chart.series[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(
            points[1].x,
            XValue::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
        assert_eq!(points[1].y, 5.0);
    }

    #[test]
    fn test_bar_chart_without_text_columns() {
        let table = load(b"units,price\n3,1.5\n4,2\n").unwrap();
        let chart = metric_chart(&table, "price").unwrap();

        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(
            chart.series[0].points,
            vec![
                ChartPoint {
                    x: XValue::Index(0),
                    y: 1.5
                },
                ChartPoint {
                    x: XValue::Index(1),
                    y: 2.0
                },
            ]
        );
    }

    #[test]
    fn test_unparseable_date_column() {
        let table = load(b"region,units\nnorth,1\nsouth,2\n").unwrap();
        let err = metric_chart(&table, "units").unwrap_err();
        assert!(matches!(err, Error::InvalidDate(ref v) if v == "north"));
    }

    #[test]
    fn test_non_numeric_metric() {
        let table = load(b"date,label\n2024-01-01,a\n").unwrap();
        assert!(matches!(
            metric_chart(&table, "label"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_forecast_chart_series() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let point = |d, value| Point { date: day(d), value };
        let result = ForecastResult {
            historical: vec![point(1, 1.0), point(2, 2.0)],
            sarima: vec![point(3, 3.0)],
            additive: vec![point(3, 2.9)],
            additive_fitted: vec![point(1, 1.1), point(2, 1.9)],
        };

        let chart = forecast_chart(&result, "sales");
        let labels: Vec<&str> = chart.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Historical", "SARIMA", "Additive"]);
        assert_eq!(chart.series[2].points.len(), 3);
        assert_eq!(chart.y_label, "sales");
    }
}
