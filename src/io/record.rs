//! Reading feature records from files and command-line assignments.
//!
//! This is the input-collection boundary for the non-interactive front-ends.
//! Values are passed through as raw `RecordValue`s; the assembler decides what
//! is numeric.

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{FeatureRecord, RecordValue};
use crate::error::AppError;

/// Read a JSON object of `field -> value` into a record.
pub fn read_record_json(path: &Path) -> Result<FeatureRecord, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open record '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| {
        AppError::new(
            2,
            format!("Invalid record JSON '{}': {e}", path.display()),
        )
    })
}

/// Parse a `name=value` assignment from `--set`.
pub fn parse_assignment(s: &str) -> Result<(String, RecordValue), AppError> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| AppError::new(2, format!("Expected NAME=VALUE, got '{s}'.")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::new(2, format!("Missing field name in '{s}'.")));
    }
    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(v) => RecordValue::Number(v),
        Err(_) => RecordValue::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

/// One data row of a batch CSV.
#[derive(Debug, Clone)]
pub struct BatchRow {
    /// 1-based line number in the file (header is line 1).
    pub line: usize,
    pub record: FeatureRecord,
}

/// A row the CSV reader itself could not parse.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct BatchInput {
    pub rows: Vec<BatchRow>,
    pub row_errors: Vec<RowError>,
}

/// Load a CSV whose header names schema fields, one applicant per row.
///
/// Empty cells are left out of the record so the assembler reports them as
/// missing fields.
pub fn read_batch_csv(path: &Path) -> Result<BatchInput, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_batch(file)
}

pub fn read_batch<R: std::io::Read>(reader: R) -> Result<BatchInput, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        match result {
            Ok(rec) => rows.push(BatchRow {
                line,
                record: record_from_row(&headers, &rec),
            }),
            Err(e) => row_errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    if rows.is_empty() && row_errors.is_empty() {
        return Err(AppError::new(3, "CSV contains no data rows."));
    }
    Ok(BatchInput { rows, row_errors })
}

fn record_from_row(headers: &[String], row: &StringRecord) -> FeatureRecord {
    headers
        .iter()
        .zip(row.iter())
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(name, cell)| (name.clone(), RecordValue::from(cell)))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may carry a UTF-8 BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').to_string()
}
