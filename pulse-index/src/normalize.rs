//! Normalization strategies mapping one raw metric to a 0-100 index.
//!
//! Every function here is pure and total over numeric input: the result is
//! always within [0, 100]. The curve constants are empirically chosen and
//! kept as literal thresholds.

use serde::{Deserialize, Serialize};

use crate::math::{
    clamp_and_round, clamp_index, finite_points, median, population_std_dev, INDEX_MAX,
    INDEX_MIN,
};
use crate::types::{Metric, NEUTRAL_INDEX};

// ---------------------------------------------------------------------------
// Curve constants
// ---------------------------------------------------------------------------

/// Minimum valid history points for distribution-relative scoring.
pub const MIN_HISTORY_POINTS: usize = 2;
/// Index points per standard deviation away from the median.
const POINTS_PER_STD_DEV: f64 = 25.0;

/// Points lost per unit above an optimal band.
const BAND_EXCESS_DECAY: f64 = 1.5;
/// Over-band values never score below the midpoint.
const BAND_EXCESS_FLOOR: f64 = 50.0;

/// Default trend percentage that maps to a full 100 (or 0 when negative).
pub const DEFAULT_TREND_SCALE: f64 = 20.0;

const FULFILLMENT_BEST_DAYS: f64 = 1.0;
const FULFILLMENT_WORST_DAYS: f64 = 7.0;

const POSITION_BEST: f64 = 1.0;
const POSITION_PAGE_ONE_END: f64 = 10.0;
const POSITION_WORST: f64 = 50.0;
/// Roughly 5.56 points per rank on page one.
const POSITION_PAGE_ONE_SLOPE: f64 = 50.0 / 9.0;
const POSITION_TAIL_SLOPE: f64 = 1.25;

const NON_BRAND_OPTIMAL_MIN: f64 = 40.0;
const NON_BRAND_OPTIMAL_MAX: f64 = 70.0;

const STOCK_DAYS_CRITICAL: f64 = 7.0;
const STOCK_DAYS_CRITICAL_INDEX: f64 = 30.0;
const STOCK_DAYS_OPTIMAL_MIN: f64 = 30.0;
const STOCK_DAYS_OPTIMAL_MAX: f64 = 60.0;
const STOCK_DAYS_EXCESS_DECAY: f64 = 0.8;

/// Index points lost per percent of catalogue out of stock.
const OUT_OF_STOCK_PENALTY: f64 = 5.0;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Score `value` against its own history.
///
/// The median maps to 50 and each population standard deviation moves the
/// index by 25 points. With fewer than two finite history points the result
/// is exactly 50; with zero variance the z-score is 0.
///
/// Lower-is-better metrics score `100 - raw`, so the two directions of the
/// same reading always sum to 100 before clamping.
pub fn normalize_to_index(value: f64, history: &[f64], higher_is_better: bool) -> f64 {
    let points = finite_points(history);
    if points.len() < MIN_HISTORY_POINTS {
        return NEUTRAL_INDEX;
    }
    let (Some(center), Some(std_dev)) = (median(&points), population_std_dev(&points)) else {
        return NEUTRAL_INDEX;
    };

    let z = if std_dev > 0.0 {
        (value - center) / std_dev
    } else {
        0.0
    };
    let raw = NEUTRAL_INDEX + z * POINTS_PER_STD_DEV;
    // Lower-is-better metrics mirror around the midpoint before clamping.
    let directed = if higher_is_better { raw } else { INDEX_MAX - raw };
    clamp_and_round(directed)
}

/// Fixed optimal band: 100 inside `[optimal_min, optimal_max]`.
///
/// Below the band the score climbs linearly from 0 towards `optimal_min`.
/// Above it the score decays 1.5 points per unit of excess but never drops
/// below 50.
pub fn normalize_percent_to_index(percent: f64, optimal_min: f64, optimal_max: f64) -> f64 {
    if percent >= optimal_min && percent <= optimal_max {
        return INDEX_MAX;
    }
    if percent < optimal_min {
        if optimal_min <= 0.0 {
            return INDEX_MIN;
        }
        return clamp_index((percent / optimal_min) * 100.0);
    }
    let excess = percent - optimal_max;
    clamp_index((INDEX_MAX - excess * BAND_EXCESS_DECAY).max(BAND_EXCESS_FLOOR))
}

/// Linear trend map: `+scale%` -> 100, `0%` -> 50, `-scale%` -> 0.
///
/// A non-positive or non-finite `scale` carries no information and yields 50.
pub fn normalize_trend_to_index(trend_percent: f64, scale: f64) -> f64 {
    if !(scale.is_finite() && scale > 0.0) {
        return NEUTRAL_INDEX;
    }
    clamp_and_round(NEUTRAL_INDEX + (trend_percent / scale) * 50.0)
}

/// One day or less scores 100, a week or more scores 0.
pub fn normalize_fulfillment_to_index(days: f64) -> f64 {
    if days <= FULFILLMENT_BEST_DAYS {
        return INDEX_MAX;
    }
    if days >= FULFILLMENT_WORST_DAYS {
        return INDEX_MIN;
    }
    let span = FULFILLMENT_WORST_DAYS - FULFILLMENT_BEST_DAYS;
    clamp_index(INDEX_MAX - (days - FULFILLMENT_BEST_DAYS) / span * INDEX_MAX)
}

/// Average search position: steep slope on page one, shallow after.
pub fn normalize_position_to_index(position: f64) -> f64 {
    if position <= POSITION_BEST {
        return INDEX_MAX;
    }
    if position >= POSITION_WORST {
        return INDEX_MIN;
    }
    if position <= POSITION_PAGE_ONE_END {
        return clamp_index(INDEX_MAX - (position - POSITION_BEST) * POSITION_PAGE_ONE_SLOPE);
    }
    clamp_index(50.0 - (position - POSITION_PAGE_ONE_END) * POSITION_TAIL_SLOPE)
}

/// Share of clicks from non-brand queries, optimal between 40% and 70%.
pub fn normalize_non_brand_to_index(percent: f64) -> f64 {
    normalize_percent_to_index(percent, NON_BRAND_OPTIMAL_MIN, NON_BRAND_OPTIMAL_MAX)
}

/// Days of stock cover, optimal between 30 and 60.
///
/// Below 30 days the score rises in two segments (0-7 days -> 0-30,
/// 7-30 days -> 30-100). Above 60 it decays 0.8 points per extra day.
pub fn normalize_stock_days_to_index(days: f64) -> f64 {
    if days < STOCK_DAYS_CRITICAL {
        return clamp_index(days / STOCK_DAYS_CRITICAL * STOCK_DAYS_CRITICAL_INDEX);
    }
    if days < STOCK_DAYS_OPTIMAL_MIN {
        let progress =
            (days - STOCK_DAYS_CRITICAL) / (STOCK_DAYS_OPTIMAL_MIN - STOCK_DAYS_CRITICAL);
        return clamp_index(
            STOCK_DAYS_CRITICAL_INDEX + progress * (INDEX_MAX - STOCK_DAYS_CRITICAL_INDEX),
        );
    }
    if days <= STOCK_DAYS_OPTIMAL_MAX {
        return INDEX_MAX;
    }
    clamp_index(INDEX_MAX - (days - STOCK_DAYS_OPTIMAL_MAX) * STOCK_DAYS_EXCESS_DECAY)
}

/// `100 - 5 * percent`: a 20% stock-out rate floors the index.
pub fn normalize_out_of_stock_to_index(percent: f64) -> f64 {
    clamp_index(INDEX_MAX - percent * OUT_OF_STOCK_PENALTY)
}

// ---------------------------------------------------------------------------
// Configurable strategy selection
// ---------------------------------------------------------------------------

fn default_higher_is_better() -> bool {
    true
}

fn default_trend_scale() -> f64 {
    DEFAULT_TREND_SCALE
}

/// Which normalizer a component uses, with its parameters.
///
/// Serialized with an internal `kind` tag so weight tables can be written
/// as `strategy = { kind = "trend", scale = 20.0 }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationStrategy {
    Distribution {
        #[serde(default = "default_higher_is_better")]
        higher_is_better: bool,
    },
    PercentRange {
        optimal_min: f64,
        optimal_max: f64,
    },
    Trend {
        #[serde(default = "default_trend_scale")]
        scale: f64,
    },
    FulfillmentTime,
    SearchPosition,
    NonBrandShare,
    StockDays,
    OutOfStock,
}

impl NormalizationStrategy {
    /// Score a metric. Only `Distribution` looks at the history.
    pub fn apply(&self, metric: &Metric) -> f64 {
        match self {
            NormalizationStrategy::Distribution { higher_is_better } => {
                normalize_to_index(metric.value, &metric.history, *higher_is_better)
            }
            NormalizationStrategy::PercentRange {
                optimal_min,
                optimal_max,
            } => normalize_percent_to_index(metric.value, *optimal_min, *optimal_max),
            NormalizationStrategy::Trend { scale } => {
                normalize_trend_to_index(metric.value, *scale)
            }
            NormalizationStrategy::FulfillmentTime => normalize_fulfillment_to_index(metric.value),
            NormalizationStrategy::SearchPosition => normalize_position_to_index(metric.value),
            NormalizationStrategy::NonBrandShare => normalize_non_brand_to_index(metric.value),
            NormalizationStrategy::StockDays => normalize_stock_days_to_index(metric.value),
            NormalizationStrategy::OutOfStock => normalize_out_of_stock_to_index(metric.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn short_history_is_neutral() {
        assert_eq!(normalize_to_index(1_000.0, &[], true), 50.0);
        assert_eq!(normalize_to_index(-5.0, &[12.0], false), 50.0);
        assert_eq!(normalize_to_index(7.0, &[3.0, f64::NAN], true), 50.0);
    }

    #[test]
    fn zero_variance_scores_midpoint() {
        assert_eq!(normalize_to_index(99.0, &[20.0, 20.0, 20.0], true), 50.0);
    }

    #[test]
    fn one_std_dev_above_median_is_75() {
        // median 50, population sd 10
        assert_eq!(normalize_to_index(60.0, &[40.0, 60.0], true), 75.0);
        assert_eq!(normalize_to_index(40.0, &[40.0, 60.0], true), 25.0);
    }

    #[test]
    fn lower_is_better_mirrors() {
        assert_eq!(normalize_to_index(60.0, &[40.0, 60.0], false), 25.0);
        assert_eq!(normalize_to_index(50.0, &[40.0, 60.0], false), 50.0);
    }

    #[test]
    fn z_of_three_clamps_to_100() {
        assert_eq!(normalize_to_index(80.0, &[40.0, 60.0], true), 100.0);
        assert_eq!(normalize_to_index(80.0, &[40.0, 60.0], false), 0.0);
    }

    #[test]
    fn percent_band_edges() {
        assert_eq!(normalize_percent_to_index(30.0, 30.0, 50.0), 100.0);
        assert_eq!(normalize_percent_to_index(50.0, 30.0, 50.0), 100.0);
        assert!(approx(normalize_percent_to_index(15.0, 30.0, 50.0), 50.0));
        assert!(approx(normalize_percent_to_index(60.0, 30.0, 50.0), 85.0));
        assert_eq!(normalize_percent_to_index(90.0, 30.0, 50.0), 50.0);
        assert_eq!(normalize_percent_to_index(-10.0, 30.0, 50.0), 0.0);
    }

    #[test]
    fn percent_band_with_zero_minimum() {
        assert_eq!(normalize_percent_to_index(0.0, 0.0, 10.0), 100.0);
        assert_eq!(normalize_percent_to_index(-1.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn trend_maps_scale_to_extremes() {
        assert_eq!(normalize_trend_to_index(20.0, DEFAULT_TREND_SCALE), 100.0);
        assert_eq!(normalize_trend_to_index(0.0, DEFAULT_TREND_SCALE), 50.0);
        assert_eq!(normalize_trend_to_index(-20.0, DEFAULT_TREND_SCALE), 0.0);
        assert_eq!(normalize_trend_to_index(5.0, DEFAULT_TREND_SCALE), 63.0);
        assert_eq!(normalize_trend_to_index(-90.0, DEFAULT_TREND_SCALE), 0.0);
        assert_eq!(normalize_trend_to_index(10.0, 0.0), 50.0);
    }

    #[test]
    fn fulfillment_curve() {
        assert_eq!(normalize_fulfillment_to_index(0.5), 100.0);
        assert_eq!(normalize_fulfillment_to_index(1.0), 100.0);
        assert!(approx(normalize_fulfillment_to_index(4.0), 50.0));
        assert_eq!(normalize_fulfillment_to_index(7.0), 0.0);
        assert_eq!(normalize_fulfillment_to_index(12.0), 0.0);
    }

    #[test]
    fn position_curve() {
        assert_eq!(normalize_position_to_index(1.0), 100.0);
        assert!(approx(normalize_position_to_index(10.0), 50.0));
        assert!(approx(normalize_position_to_index(30.0), 25.0));
        assert_eq!(normalize_position_to_index(50.0), 0.0);
        assert_eq!(normalize_position_to_index(80.0), 0.0);
        let second = normalize_position_to_index(2.0);
        assert!((second - 94.44).abs() < 0.01, "position 2 scored {}", second);
    }

    #[test]
    fn non_brand_band() {
        assert_eq!(normalize_non_brand_to_index(55.0), 100.0);
        assert!(approx(normalize_non_brand_to_index(20.0), 50.0));
        assert!(approx(normalize_non_brand_to_index(80.0), 85.0));
        assert_eq!(normalize_non_brand_to_index(100.0), 55.0);
    }

    #[test]
    fn stock_days_segments() {
        assert_eq!(normalize_stock_days_to_index(0.0), 0.0);
        assert!(approx(normalize_stock_days_to_index(7.0), 30.0));
        assert!(approx(normalize_stock_days_to_index(3.5), 15.0));
        assert_eq!(normalize_stock_days_to_index(30.0), 100.0);
        assert_eq!(normalize_stock_days_to_index(60.0), 100.0);
        assert!(approx(normalize_stock_days_to_index(110.0), 60.0));
        assert_eq!(normalize_stock_days_to_index(400.0), 0.0);
    }

    #[test]
    fn out_of_stock_penalty() {
        assert_eq!(normalize_out_of_stock_to_index(0.0), 100.0);
        assert_eq!(normalize_out_of_stock_to_index(10.0), 50.0);
        assert_eq!(normalize_out_of_stock_to_index(20.0), 0.0);
        assert_eq!(normalize_out_of_stock_to_index(35.0), 0.0);
    }

    #[test]
    fn strategy_dispatch_uses_history_only_for_distribution() {
        let metric = Metric::new("revenue", 60.0).with_history(vec![40.0, 60.0]);
        let dist = NormalizationStrategy::Distribution {
            higher_is_better: true,
        };
        assert_eq!(dist.apply(&metric), 75.0);
        assert_eq!(NormalizationStrategy::OutOfStock.apply(&metric), 0.0);
    }

    #[test]
    fn strategy_parses_from_tagged_table() {
        let strategy: NormalizationStrategy =
            serde_json::from_str(r#"{"kind":"trend"}"#).unwrap();
        assert_eq!(
            strategy,
            NormalizationStrategy::Trend {
                scale: DEFAULT_TREND_SCALE
            }
        );
        let dist: NormalizationStrategy =
            serde_json::from_str(r#"{"kind":"distribution","higher_is_better":false}"#).unwrap();
        assert_eq!(
            dist,
            NormalizationStrategy::Distribution {
                higher_is_better: false
            }
        );
    }
}
