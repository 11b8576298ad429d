use std::collections::BTreeMap;

use crate::models::{EquipmentRecord, Parameter, ParameterStats, SummaryStats};

/// Summarize a record set.
///
/// Pure and deterministic. Standard deviation is the population form
/// (divides by N). Values are sorted before accumulation so any permutation
/// of `records` produces bit-identical statistics.
pub fn summarize(records: &[EquipmentRecord]) -> SummaryStats {
    let mut equipment_type_distribution = BTreeMap::new();
    for record in records {
        *equipment_type_distribution
            .entry(record.equipment_type)
            .or_insert(0) += 1;
    }

    let mut parameter_stats = BTreeMap::new();
    if !records.is_empty() {
        for parameter in Parameter::ALL {
            let mut values: Vec<f64> = records.iter().map(|r| parameter.value_of(r)).collect();
            values.sort_by(f64::total_cmp);
            parameter_stats.insert(parameter, describe_sorted(&values));
        }
    }

    SummaryStats {
        total_count: records.len(),
        equipment_type_distribution,
        parameter_stats,
    }
}

/// `values` must be non-empty and sorted ascending.
fn describe_sorted(values: &[f64]) -> ParameterStats {
    let min = values[0];
    let max = values[values.len() - 1];
    let count = values.len() as f64;

    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    let (mean, std) = if mean.is_finite() && variance.is_finite() {
        (mean, variance.sqrt())
    } else {
        describe_scaled(values, min, max)
    };

    ParameterStats { mean, min, max, std }
}

/// Mean and std computed on values divided by the largest magnitude, for
/// inputs whose sums or squared deviations overflow `f64`.
///
/// The mean stays within `[min, max]` and the std within half the range.
fn describe_scaled(values: &[f64], min: f64, max: f64) -> (f64, f64) {
    let scale = min.abs().max(max.abs());
    if scale == 0.0 {
        return (0.0, 0.0);
    }
    let count = values.len() as f64;

    let mean_scaled = values.iter().map(|v| v / scale).sum::<f64>() / count;
    let variance_scaled = values
        .iter()
        .map(|v| (v / scale - mean_scaled).powi(2))
        .sum::<f64>()
        / count;

    let mean = (mean_scaled * scale).clamp(min, max);
    let std = (variance_scaled.sqrt() * scale).min(max / 2.0 - min / 2.0);
    (mean, std)
}
