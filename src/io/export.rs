//! Export batch scoring results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::app::pipeline::ScoredRow;
use crate::domain::Profile;
use crate::error::AppError;

const BASE_COLUMNS: [&str; 7] = [
    "line",
    "profile",
    "scored_at",
    "label",
    "category",
    "severity",
    "error",
];

/// Write batch results to a CSV file.
pub fn write_results_csv(
    path: &Path,
    rows: &[ScoredRow],
    profile: Profile,
    scored_at: DateTime<Utc>,
    probability_labels: &[i64],
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;
    write_results(file, rows, profile, scored_at, probability_labels)
}

/// Write batch results as CSV to any writer (stdout for `credisense batch`).
///
/// One `p_<label>` column is appended per entry of `probability_labels`; pass an
/// empty slice to leave them out.
pub fn write_results<W: Write>(
    writer: W,
    rows: &[ScoredRow],
    profile: Profile,
    scored_at: DateTime<Utc>,
    probability_labels: &[i64],
) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    let stamp = scored_at.to_rfc3339();

    let mut header: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();
    header.extend(probability_labels.iter().map(|l| format!("p_{l}")));
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for row in rows {
        let mut record = vec![row.line.to_string(), profile.tag().to_string(), stamp.clone()];
        match &row.outcome {
            Ok(a) => {
                record.extend([
                    a.label.to_string(),
                    a.category.to_string(),
                    a.severity.to_string(),
                    String::new(),
                ]);
                record.extend(probability_labels.iter().map(|&label| {
                    a.probabilities
                        .iter()
                        .flatten()
                        .find(|p| p.label == label)
                        .map(|p| format!("{:.6}", p.probability))
                        .unwrap_or_default()
                }));
            }
            Err(e) => {
                record.extend([String::new(), String::new(), String::new(), e.to_string()]);
                record.extend(probability_labels.iter().map(|_| String::new()));
            }
        }
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
