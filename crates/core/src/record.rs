//! Input records and the dataset schema.
//!
//! A [`Record`] is one row of the input table, already parsed and cleaned.
//! Records are immutable once loaded; every aggregate is recomputed from
//! them so identical input always yields identical results.

use serde::{Deserialize, Serialize};

/// Column names mapping the input table onto the domain model.
///
/// The dimension column carries the categorical segment value; the measure
/// column the numeric value under diagnosis (e.g. a discount rate); the
/// profit column the profit/loss per row. The volume column, when present,
/// weights the measure average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Categorical grouping dimension (e.g. "Category").
    pub dimension: String,

    /// Numeric measure under diagnosis (e.g. "Discount").
    pub measure: String,

    /// Profit/loss column (e.g. "Profit").
    pub profit: String,

    /// Optional volume/weight column (e.g. "Quantity").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
}

/// One row of input data. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The segment this row belongs to (value of the dimension column).
    pub segment: String,

    /// The measure value for this row.
    pub measure: f64,

    /// Profit (positive) or loss (negative) for this row.
    pub profit: f64,

    /// Volume weight, if the schema configures one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Record {
    /// Convenience constructor for unweighted rows.
    pub fn new(segment: impl Into<String>, measure: f64, profit: f64) -> Self {
        Self {
            segment: segment.into(),
            measure,
            profit,
            volume: None,
        }
    }

    /// Convenience constructor for volume-weighted rows.
    pub fn weighted(segment: impl Into<String>, measure: f64, profit: f64, volume: f64) -> Self {
        Self {
            segment: segment.into(),
            measure,
            profit,
            volume: Some(volume),
        }
    }
}
