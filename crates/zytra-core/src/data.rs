//! Tabular data loading
//!
//! Uploaded files are comma-separated text with a header row. Cells are kept
//! as raw strings; typing happens on demand (column classification, date and
//! number parsing for charts and forecasts).

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// Cell values treated as missing
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "#N/A", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "n/a",
];

/// Date-only formats, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2024-01-15
    "%Y/%m/%d",  // 2024/01/15
    "%m/%d/%y",  // 01/15/24
    "%m/%d/%Y",  // 01/15/2024
    "%m-%d-%Y",  // 01-15-2024
    "%d.%m.%Y",  // 15.01.2024
    "%Y%m%d",    // 20240115
    "%d %b %Y",  // 15 Jan 2024
    "%b %d, %Y", // Jan 15, 2024
    "%B %d, %Y", // January 15, 2024
];

/// Date-time formats (time of day is dropped)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// An uploaded table: ordered column names and rows of optional cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// Column names split by inferred type, each in table order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnKinds {
    pub numeric: Vec<String>,
    pub other: Vec<String>,
}

impl Table {
    /// Build a table from already-split cells. Row lengths must match the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(Error::Parse(format!(
                "row {} has {} fields, expected {}",
                i + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows, for previews
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown column: {}", name)))
    }

    /// Raw cells of a column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// Cells of a column parsed as numbers. Missing cells stay `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.column(name)?
            .into_iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(raw) => parse_number(raw).map(Some).ok_or_else(|| {
                    Error::InvalidInput(format!("Column {} has non-numeric value: {}", name, raw))
                }),
            })
            .collect()
    }

    /// Split columns into numeric and other.
    ///
    /// A column is numeric iff every non-missing value parses as a number.
    /// A column with no values at all counts as numeric.
    pub fn classify_columns(&self) -> ColumnKinds {
        let mut kinds = ColumnKinds::default();
        for (idx, name) in self.columns.iter().enumerate() {
            let numeric = self
                .rows
                .iter()
                .filter_map(|r| r[idx].as_deref())
                .all(|v| parse_number(v).is_some());
            if numeric {
                kinds.numeric.push(name.clone());
            } else {
                kinds.other.push(name.clone());
            }
        }
        kinds
    }
}

/// Parse delimited text with a header row into a [`Table`]
pub fn load(bytes: &[u8]) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(Error::Parse("file has no header row".into()));
    }
    let columns = header_columns(headers.iter())?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect(),
        );
    }

    debug!("Loaded table with {} columns and {} rows", columns.len(), rows.len());
    Table::new(columns, rows)
}

/// Header names, rejecting blank or repeated ones
fn header_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for (i, raw) in headers.enumerate() {
        if raw.trim().is_empty() {
            return Err(Error::Parse(format!("column {} has an empty name", i + 1)));
        }
        if !seen.insert(raw) {
            return Err(Error::Parse(format!("duplicate column name: {}", raw)));
        }
        columns.push(raw.to_string());
    }

    Ok(columns)
}

/// Whether a raw cell counts as missing
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_MARKERS.contains(&trimmed)
}

/// Parse an integer or float cell
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Parse a cell into a calendar date
pub fn parse_date(cell: &str) -> Result<NaiveDate> {
    let s = cell.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(Error::InvalidDate(cell.to_string()))
}

/// SHA-256 fingerprint of raw upload bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A parsed upload, kept for the lifetime of its session
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub fingerprint: String,
    pub size: usize,
    #[serde(skip)]
    pub table: Table,
}

impl UploadedFile {
    pub fn parse(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let table = load(bytes).map_err(|e| match e {
            Error::Csv(err) => Error::Parse(format!("{}: {}", name, err)),
            Error::Parse(msg) => Error::Parse(format!("{}: {}", name, msg)),
            other => other,
        })?;
        Ok(Self {
            name,
            fingerprint: fingerprint(bytes),
            size: bytes.len(),
            table,
        })
    }

    /// Parse a batch of uploads, failing on the first bad file
    pub fn parse_batch(files: &[(String, Vec<u8>)]) -> Result<Vec<Self>> {
        files
            .iter()
            .map(|(name, bytes)| Self::parse(name.as_str(), bytes))
            .collect()
    }
}
