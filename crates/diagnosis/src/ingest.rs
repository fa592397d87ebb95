//! CSV ingestion with schema validation and value cleaning.
//!
//! Raw exports often carry currency strings ("$1,200.00") and percent
//! suffixes ("15%"). Cleaning happens here, once, so the engine only ever
//! sees parsed numbers. A cell that still fails to parse is an error naming
//! its row and column — rows are never dropped silently.

use std::io::Read;
use std::path::Path;
use trendspotter_core::error::DiagnosisError;
use trendspotter_core::record::{Record, Schema};

/// Load records from a CSV file, validating the schema against its header.
pub fn load_csv(path: &Path, schema: &Schema) -> Result<Vec<Record>, DiagnosisError> {
    let file = std::fs::File::open(path).map_err(|e| DiagnosisError::Io(e.to_string()))?;
    load_reader(file, schema)
}

/// Load records from any reader producing CSV with a header row.
pub fn load_reader<R: Read>(reader: R, schema: &Schema) -> Result<Vec<Record>, DiagnosisError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| DiagnosisError::Io(e.to_string()))?
        .clone();

    let column = |name: &str| -> Result<usize, DiagnosisError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DiagnosisError::UnknownMeasure(name.to_string()))
    };

    let dim_idx = column(&schema.dimension)?;
    let measure_idx = column(&schema.measure)?;
    let profit_idx = column(&schema.profit)?;
    let volume_idx = match &schema.volume {
        Some(name) => Some(column(name)?),
        None => None,
    };

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| DiagnosisError::Io(e.to_string()))?;
        // Header is row 0 for the user; data rows start at 1.
        let row_number = i + 1;

        let segment = row.get(dim_idx).unwrap_or("").trim().to_string();
        let measure = parse_numeric(row.get(measure_idx).unwrap_or(""))
            .ok_or_else(|| invalid_cell(row_number, &schema.measure, row.get(measure_idx)))?;
        let profit = parse_numeric(row.get(profit_idx).unwrap_or(""))
            .ok_or_else(|| invalid_cell(row_number, &schema.profit, row.get(profit_idx)))?;

        let volume = match volume_idx {
            Some(idx) => {
                let raw = row.get(idx).unwrap_or("");
                // An empty volume cell means "unweighted row", not an error.
                if raw.trim().is_empty() {
                    None
                } else {
                    Some(
                        parse_numeric(raw)
                            .ok_or_else(|| invalid_cell(row_number, schema.volume.as_deref().unwrap_or(""), Some(raw)))?,
                    )
                }
            }
            None => None,
        };

        records.push(Record {
            segment,
            measure,
            profit,
            volume,
        });
    }

    if records.is_empty() {
        return Err(DiagnosisError::EmptyDataset);
    }

    tracing::info!(rows = records.len(), "Dataset ingested and cleaned");
    Ok(records)
}

fn invalid_cell(row: usize, column: &str, value: Option<&str>) -> DiagnosisError {
    DiagnosisError::InvalidCell {
        row,
        column: column.to_string(),
        value: value.unwrap_or("").to_string(),
    }
}

/// Parse a numeric cell, tolerating currency symbols, thousands separators,
/// and a percent suffix (which divides by 100).
fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (body, percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    Some(if percent { value / 100.0 } else { value })
}
