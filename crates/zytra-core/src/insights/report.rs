//! Downloadable plain-text report

use serde::Serialize;

use super::insights;

pub const REPORT_TITLE: &str = "Zytra Analytics Report";
pub const REPORT_FILENAME: &str = "zytra_report.txt";

/// Report body built from insight statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub insights: Vec<String>,
}

impl Report {
    pub fn new(insights: Vec<String>) -> Self {
        Self { insights }
    }

    /// Build straight from a series and its forecast
    pub fn from_series(historical: &[f64], forecast: &[f64]) -> Self {
        Self::new(insights(historical, forecast))
    }

    /// Title, a blank line, then one statement per line
    pub fn render(&self) -> String {
        format!("{}\n\n{}", REPORT_TITLE, self.insights.join("\n"))
    }

    pub fn filename(&self) -> &'static str {
        REPORT_FILENAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let report = Report::from_series(&[10.0, 10.0], &[15.0]);
        let text = report.render();

        assert!(text.starts_with("Zytra Analytics Report\n\nAverage historical demand: 10.00\n"));
        assert!(text.ends_with("⚠️ High stock-out risk if inventory is not adjusted"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(Report::new(vec![]).render(), "Zytra Analytics Report\n\n");
    }
}
