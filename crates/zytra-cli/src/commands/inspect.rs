//! Inspect command implementation

use std::path::Path;

use anyhow::Result;
use zytra_core::Table;

use super::{read_table, truncate};

const CELL_WIDTH: usize = 16;

pub fn cmd_inspect(file: &Path, rows: usize) -> Result<()> {
    let table = read_table(file)?;
    let kinds = table.classify_columns();

    println!("📄 {}", file.display());
    println!("   Rows: {}", table.len());
    println!("   Columns: {}", table.columns().len());
    println!();
    println!("   Numeric: {}", list_or_none(&kinds.numeric));
    println!("   Other:   {}", list_or_none(&kinds.other));
    println!();

    if table.is_empty() {
        println!("   (no rows)");
        return Ok(());
    }
    print!("{}", format_preview(&table.head(rows)));
    Ok(())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Fixed-width rendering of a table; missing cells print as blanks
pub fn format_preview(table: &Table) -> String {
    let cell = |s: &str| format!("{:<width$}", truncate(s, CELL_WIDTH), width = CELL_WIDTH);

    let mut out = String::new();
    let header: Vec<String> = table.columns().iter().map(|c| cell(c)).collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(table.columns().len() * (CELL_WIDTH + 1)));
    out.push('\n');

    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|c| cell(c.as_deref().unwrap_or(""))).collect();
        out.push_str(line.join(" ").trim_end());
        out.push('\n');
    }
    out
}
