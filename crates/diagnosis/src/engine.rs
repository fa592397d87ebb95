//! The worst-segment detection engine.
//!
//! Pure functions over immutable records: grouping and aggregation carry no
//! side effects, so identical input always yields an identical
//! [`DiagnosticResult`].

use std::collections::BTreeMap;
use trendspotter_core::error::DiagnosisError;
use trendspotter_core::record::Record;
use trendspotter_core::stats::{AggregateStat, DiagnosticResult, LossMetric};

/// Compute one [`AggregateStat`] per segment present in the records.
///
/// The weighted measure average uses the volume field where present; rows
/// without a volume weigh 1.0 so datasets with a partially-populated volume
/// column still aggregate.
pub fn aggregate(records: &[Record]) -> Vec<AggregateStat> {
    // BTreeMap keeps segments in name order, which makes the output
    // reproducible independent of input row order.
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records {
        groups.entry(record.segment.as_str()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(segment, rows)| {
            let count = rows.len();
            let profit_sum: f64 = rows.iter().map(|r| r.profit).sum();
            let measure_sum: f64 = rows.iter().map(|r| r.measure).sum();

            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for r in &rows {
                let w = r.volume.unwrap_or(1.0);
                weighted_sum += r.measure * w;
                weight_total += w;
            }

            AggregateStat {
                segment: segment.to_string(),
                profit_sum,
                profit_mean: profit_sum / count as f64,
                measure_mean: measure_sum / count as f64,
                measure_weighted: if weight_total > 0.0 {
                    weighted_sum / weight_total
                } else {
                    measure_sum / count as f64
                },
                count,
            }
        })
        .collect()
}

/// Find the single worst segment under `metric`.
///
/// Ties within `epsilon` of the minimum metric value are broken by largest
/// record count, then by segment name ascending — a total, reproducible
/// order.
pub fn diagnose(
    records: &[Record],
    metric: LossMetric,
    epsilon: f64,
) -> Result<DiagnosticResult, DiagnosisError> {
    if records.is_empty() {
        return Err(DiagnosisError::EmptyDataset);
    }

    let stats = aggregate(records);

    let minimum = stats
        .iter()
        .map(|s| metric.value(s))
        .fold(f64::INFINITY, f64::min);

    // All candidates within epsilon of the minimum are tied.
    let worst = stats
        .iter()
        .filter(|s| metric.value(s) - minimum <= epsilon)
        .max_by(|a, b| {
            a.count
                .cmp(&b.count)
                .then_with(|| b.segment.cmp(&a.segment))
        })
        .ok_or(DiagnosisError::EmptyDataset)?;

    let metric_value = metric.value(worst);

    tracing::debug!(
        segment = %worst.segment,
        metric = %metric,
        value = metric_value,
        "Worst segment selected"
    );

    Ok(DiagnosticResult {
        segment: worst.segment.clone(),
        metric_value,
        loss_magnitude: metric_value.abs(),
        metric,
        measure_mean: worst.measure_mean,
        segment_count: worst.count,
        total_rows: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Vec<Record> {
        vec![
            Record::new("Furniture", 0.30, -250.0),
            Record::new("Furniture", 0.20, -250.0),
            Record::new("Technology", 0.05, 400.0),
            Record::new("Office", 0.10, -50.0),
        ]
    }

    #[test]
    fn aggregates_one_stat_per_segment() {
        let stats = aggregate(&dataset());
        assert_eq!(stats.len(), 3);
        let furniture = stats.iter().find(|s| s.segment == "Furniture").unwrap();
        assert_eq!(furniture.count, 2);
        assert_eq!(furniture.profit_sum, -500.0);
        assert_eq!(furniture.profit_mean, -250.0);
        assert!((furniture.measure_mean - 0.25).abs() < 1e-12);
    }

    #[test]
    fn weighted_average_uses_volume() {
        let records = vec![
            Record::weighted("A", 0.10, 0.0, 1.0),
            Record::weighted("A", 0.40, 0.0, 3.0),
        ];
        let stats = aggregate(&records);
        // (0.1*1 + 0.4*3) / 4 = 0.325
        assert!((stats[0].measure_weighted - 0.325).abs() < 1e-12);
        assert!((stats[0].measure_mean - 0.25).abs() < 1e-12);
    }

    #[test]
    fn unweighted_when_no_volume() {
        let records = vec![Record::new("A", 0.10, 0.0), Record::new("A", 0.40, 0.0)];
        let stats = aggregate(&records);
        assert!((stats[0].measure_weighted - 0.25).abs() < 1e-12);
    }

    #[test]
    fn picks_most_negative_segment() {
        let result = diagnose(&dataset(), LossMetric::TotalProfit, 1e-6).unwrap();
        assert_eq!(result.segment, "Furniture");
        assert_eq!(result.metric_value, -500.0);
        assert_eq!(result.loss_magnitude, 500.0);
        assert_eq!(result.segment_count, 2);
        assert_eq!(result.total_rows, 4);
    }

    #[test]
    fn deterministic_across_runs() {
        let records = dataset();
        let a = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        let b = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tie_break_by_name_ascending() {
        // Losses {-500 B, -500 A, -200 C}, equal counts — "A" must win.
        let records = vec![
            Record::new("B", 0.1, -500.0),
            Record::new("A", 0.1, -500.0),
            Record::new("C", 0.1, -200.0),
        ];
        let result = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        assert_eq!(result.segment, "A");
    }

    #[test]
    fn tie_break_is_input_order_insensitive() {
        let mut records = vec![
            Record::new("B", 0.1, -500.0),
            Record::new("A", 0.1, -500.0),
        ];
        let forward = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        records.reverse();
        let reversed = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        assert_eq!(forward.segment, reversed.segment);
        assert_eq!(forward.segment, "A");
    }

    #[test]
    fn tie_break_prefers_larger_count() {
        let records = vec![
            Record::new("A", 0.1, -500.0),
            Record::new("B", 0.1, -250.0),
            Record::new("B", 0.1, -250.0),
        ];
        let result = diagnose(&records, LossMetric::TotalProfit, 1e-6).unwrap();
        // Both sum to -500; B has two rows so it wins despite the name.
        assert_eq!(result.segment, "B");
    }

    #[test]
    fn epsilon_widens_the_tie() {
        let records = vec![
            Record::new("B", 0.1, -500.0),
            Record::new("A", 0.1, -499.9999999),
        ];
        // Within 1e-6 they are distinct; within 1e-3 they tie and A wins.
        let strict = diagnose(&records, LossMetric::TotalProfit, 1e-9).unwrap();
        assert_eq!(strict.segment, "B");
        let loose = diagnose(&records, LossMetric::TotalProfit, 1e-3).unwrap();
        assert_eq!(loose.segment, "A");
    }

    #[test]
    fn empty_dataset_errors() {
        let err = diagnose(&[], LossMetric::TotalProfit, 1e-6).unwrap_err();
        assert!(matches!(err, DiagnosisError::EmptyDataset));
    }

    #[test]
    fn weighted_measure_metric_ranks_high_discount_worst() {
        let records = vec![
            Record::weighted("Deep", 0.50, 10.0, 2.0),
            Record::weighted("Shallow", 0.05, 10.0, 2.0),
        ];
        let result = diagnose(&records, LossMetric::WeightedMeasure, 1e-6).unwrap();
        assert_eq!(result.segment, "Deep");
        assert!((result.loss_magnitude - 0.50).abs() < 1e-12);
    }

    #[test]
    fn mean_profit_metric() {
        let records = vec![
            Record::new("A", 0.1, -10.0),
            Record::new("A", 0.1, -10.0),
            Record::new("B", 0.1, -15.0),
        ];
        // A sums to -20 but averages -10; B averages -15 and is worse.
        let result = diagnose(&records, LossMetric::MeanProfit, 1e-6).unwrap();
        assert_eq!(result.segment, "B");
    }
}
