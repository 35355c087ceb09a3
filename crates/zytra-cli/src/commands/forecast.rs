//! Forecast command implementation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use zytra_core::{run_forecast, ForecastRequest, ForecastResult, Report};

use super::read_table;

pub fn cmd_forecast(
    file: &Path,
    request: ForecastRequest,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let report = forecast_report(file, &request, json)?;

    if let Some(path) = output {
        fs::write(path, report.render())
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !json {
            println!();
            println!("📝 Report written to {}", path.display());
        }
    }
    Ok(())
}

/// Fit both models on `file` and print the result. Returns the report.
pub fn forecast_report(file: &Path, request: &ForecastRequest, json: bool) -> Result<Report> {
    let table = read_table(file)?;
    let result = run_forecast(&table, request).context("Forecast failed")?;
    let report = Report::from_series(&result.historical_values(), &result.sarima_values());

    if json {
        let body = serde_json::json!({
            "request": request,
            "result": result,
            "insights": report.insights,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_summary(request, &result, &report);
    }
    Ok(report)
}

fn print_summary(request: &ForecastRequest, result: &ForecastResult, report: &Report) {
    println!(
        "📈 Forecast of {} over {} days ({} observations)",
        request.value_column,
        request.horizon,
        result.historical.len()
    );
    println!();
    println!("   {:<12} {:>12} {:>12}", "Date", "SARIMA", "Additive");
    for (a, b) in result.sarima.iter().zip(&result.additive) {
        println!("   {:<12} {:>12.2} {:>12.2}", a.date, a.value, b.value);
    }
    println!();
    println!("💡 Insights");
    for line in &report.insights {
        println!("   {}", line);
    }
}
