//! Shared numeric utilities for index normalization.

use crate::types::NEUTRAL_INDEX;

/// Lower bound of every index.
pub const INDEX_MIN: f64 = 0.0;
/// Upper bound of every index.
pub const INDEX_MAX: f64 = 100.0;

/// Drop non-finite points (NaN, +/-inf) from a series.
pub fn finite_points(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median of a series, averaging the two middle points for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N, not N - 1).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Clamp into [0, 100]. NaN collapses to the neutral midpoint so the
/// bounded-output contract holds even for garbage input.
pub fn clamp_index(raw: f64) -> f64 {
    if raw.is_nan() {
        return NEUTRAL_INDEX;
    }
    raw.clamp(INDEX_MIN, INDEX_MAX)
}

/// Clamp, then round to the nearest whole point.
pub fn clamp_and_round(raw: f64) -> f64 {
    clamp_index(raw).round()
}
