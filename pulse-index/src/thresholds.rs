//! Alert thresholds for index levels, period-over-period drops, and stock-outs.
//!
//! The constants are the built-in defaults. Operators override them through
//! the `[thresholds]` section of the index configuration, so the evaluator
//! never reads these constants directly.

use serde::{Deserialize, Serialize};

/// Index level below which a warning is raised.
pub const INDEX_WARNING_FLOOR: f64 = 40.0;

/// Index level below which a critical alert is raised instead of a warning.
pub const INDEX_CRITICAL_FLOOR: f64 = 25.0;

/// Point drop (previous minus current) beyond which a warning is raised.
pub const DROP_WARNING_POINTS: f64 = 5.0;

/// Point drop beyond which a critical alert is raised instead of a warning.
pub const DROP_CRITICAL_POINTS: f64 = 10.0;

/// Metric key of the always-tracked stock-out percentage.
pub const OUT_OF_STOCK_METRIC: &str = "out_of_stock_percent";

/// Stock-out percentage at or above which a warning is raised.
pub const OUT_OF_STOCK_WARNING_PCT: f64 = 5.0;

/// Stock-out percentage at or above which a critical alert is raised.
pub const OUT_OF_STOCK_CRITICAL_PCT: f64 = 10.0;

/// Named threshold table consumed by the delta and alert evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub index_warning: f64,
    pub index_critical: f64,
    /// Positive number of points; a delta below `-drop_warning` fires.
    pub drop_warning: f64,
    pub drop_critical: f64,
    pub out_of_stock: OutOfStockThresholds,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            index_warning: INDEX_WARNING_FLOOR,
            index_critical: INDEX_CRITICAL_FLOOR,
            drop_warning: DROP_WARNING_POINTS,
            drop_critical: DROP_CRITICAL_POINTS,
            out_of_stock: OutOfStockThresholds::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutOfStockThresholds {
    /// Component name whose raw value is the stock-out percentage.
    pub metric: String,
    pub warning_pct: f64,
    pub critical_pct: f64,
}

impl Default for OutOfStockThresholds {
    fn default() -> Self {
        Self {
            metric: OUT_OF_STOCK_METRIC.to_string(),
            warning_pct: OUT_OF_STOCK_WARNING_PCT,
            critical_pct: OUT_OF_STOCK_CRITICAL_PCT,
        }
    }
}
