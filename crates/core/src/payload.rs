//! The strict context boundary.
//!
//! [`ContextPayload`] is the only information the narrative generator is
//! allowed to see. It is an immutable projection of a
//! [`DiagnosticResult`](crate::stats::DiagnosticResult) plus display
//! metadata, and it owns the closed set of numbers a narrative may cite.

use crate::stats::{DiagnosticResult, LossMetric};
use serde::{Deserialize, Serialize};

/// The fixed refusal sentinel. A backend response equal to this string (after
/// trimming) is the only accepted substitute for a normal narrative.
pub const INCONCLUSIVE_SENTINEL: &str = "Data Inconclusive";

/// Immutable structured context handed to the narrative generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    /// The worst-performing segment.
    pub segment: String,

    /// Loss magnitude (always positive).
    pub loss_magnitude: f64,

    /// Name of the metric that selected the segment.
    pub metric: String,

    /// Mean measure within the segment, as a fraction (0.15 = 15%).
    pub measure_mean: f64,

    /// Display units for the loss (e.g. "USD").
    pub units: String,

    /// Rows in the whole dataset.
    pub row_count: usize,

    /// Rows in the worst segment.
    pub segment_rows: usize,
}

impl ContextPayload {
    /// Build a payload from a diagnostic result.
    pub fn from_diagnostic(diag: &DiagnosticResult, units: impl Into<String>) -> Self {
        Self {
            segment: diag.segment.clone(),
            loss_magnitude: diag.loss_magnitude,
            metric: diag.metric.name().to_string(),
            measure_mean: diag.measure_mean,
            units: units.into(),
            row_count: diag.total_rows,
            segment_rows: diag.segment_count,
        }
    }

    /// The closed set of numeric values a narrative may reference.
    ///
    /// Rates appear both as fractions and as percent values so a response
    /// saying "15%" validates against a stored 0.15.
    pub fn numeric_values(&self) -> Vec<f64> {
        vec![
            self.loss_magnitude,
            -self.loss_magnitude,
            self.measure_mean,
            self.measure_mean * 100.0,
            self.row_count as f64,
            self.segment_rows as f64,
        ]
    }

    /// Whether the metric ranks by a rate rather than a currency amount.
    pub fn is_rate_metric(&self) -> bool {
        self.metric == LossMetric::WeightedMeasure.name()
    }
}

/// The outcome of the narrative step: a validated narrative, or the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeResult {
    /// A backend response that passed guardrail validation.
    Narrative { text: String },
    /// The refusal sentinel — data lacked a decisive signal, or the response
    /// failed validation and was absorbed.
    Inconclusive,
}

impl NarrativeResult {
    /// The text to lay out on the page.
    pub fn text(&self) -> &str {
        match self {
            Self::Narrative { text } => text,
            Self::Inconclusive => INCONCLUSIVE_SENTINEL,
        }
    }

    /// Whether this is the refusal sentinel.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive)
    }
}
