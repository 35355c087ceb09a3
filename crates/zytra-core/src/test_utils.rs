//! Test utilities for zytra-core
//!
//! Deterministic sample tables for forecast and end-to-end tests.

use chrono::{Duration, NaiveDate};

/// Day-of-week offsets added to generated series
pub const WEEKLY_PATTERN: [f64; 7] = [0.0, 6.0, 9.0, 4.0, -3.0, -7.0, -9.0];

/// First date of generated series
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Value of the generated series on day `i`: trend + weekly pattern + fixed jitter
pub fn sample_value(i: usize) -> f64 {
    let jitter = ((i * 37) % 11) as f64 * 0.3 - 1.5;
    100.0 + 0.4 * i as f64 + WEEKLY_PATTERN[i % 7] + jitter
}

/// CSV with `date,sales,region` columns and `days` consecutive daily rows
pub fn daily_csv(days: usize) -> String {
    let mut csv = String::from("date,sales,region\n");
    for i in 0..days {
        let date = start_date() + Duration::days(i as i64);
        let region = if i % 2 == 0 { "north" } else { "south" };
        csv.push_str(&format!(
            "{},{:.2},{}\n",
            date.format("%Y-%m-%d"),
            sample_value(i),
            region
        ));
    }
    csv
}

/// Same rows as [`daily_csv`], newest first
pub fn daily_csv_descending(days: usize) -> String {
    let full = daily_csv(days);
    let mut lines = full.lines();
    let header = lines.next().unwrap_or_default();
    let mut rows: Vec<&str> = lines.collect();
    rows.reverse();

    let mut csv = format!("{}\n", header);
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    csv
}
