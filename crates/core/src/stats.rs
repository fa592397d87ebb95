//! Per-segment aggregates and the diagnostic result.

use serde::{Deserialize, Serialize};

/// Computed values for one segment. Exactly one per segment present in the
/// input; always recomputed from records, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    /// The segment these aggregates describe.
    pub segment: String,

    /// Sum of profit across the segment's rows.
    pub profit_sum: f64,

    /// Mean profit per row.
    pub profit_mean: f64,

    /// Mean of the measure.
    pub measure_mean: f64,

    /// Volume-weighted average of the measure; equals `measure_mean` when
    /// no volume column is configured.
    pub measure_weighted: f64,

    /// Number of rows in the segment.
    pub count: usize,
}

/// The scalar formula used to rank segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossMetric {
    /// Total profit (sum) — most negative segment loses.
    TotalProfit,
    /// Mean profit per row.
    MeanProfit,
    /// Volume-weighted measure average, negated so a high discount rate
    /// ranks as the worst performer.
    WeightedMeasure,
}

impl LossMetric {
    /// The metric value for a segment. Smaller (more negative) is worse.
    pub fn value(&self, stat: &AggregateStat) -> f64 {
        match self {
            Self::TotalProfit => stat.profit_sum,
            Self::MeanProfit => stat.profit_mean,
            Self::WeightedMeasure => -stat.measure_weighted,
        }
    }

    /// Stable name used in payloads and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TotalProfit => "total_profit",
            Self::MeanProfit => "mean_profit",
            Self::WeightedMeasure => "weighted_measure",
        }
    }
}

impl std::fmt::Display for LossMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The single worst segment under a [`LossMetric`], with its loss magnitude.
///
/// Deterministic for a given dataset and metric: ties within epsilon are
/// broken by largest record count, then by segment name ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    /// The worst-performing segment.
    pub segment: String,

    /// The metric value for that segment (negative for a loss).
    pub metric_value: f64,

    /// Absolute magnitude of the loss.
    pub loss_magnitude: f64,

    /// Which metric selected the segment.
    pub metric: LossMetric,

    /// Mean measure value within the worst segment.
    pub measure_mean: f64,

    /// Rows in the worst segment.
    pub segment_count: usize,

    /// Rows in the whole dataset.
    pub total_rows: usize,
}
