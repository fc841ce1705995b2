//! Store Pulse KPI index engine.
//!
//! Raw retail metrics flow one way through three stages:
//! - `normalize`: each metric becomes a 0-100 index
//! - `composite`: indices combine into category indices and an overall index
//! - `alerts`: the result is compared with the previous period
//!
//! Everything here is pure computation over borrowed data. Fetching metrics
//! and persisting snapshots belong to the caller.

pub mod alerts;
pub mod composite;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod normalize;
pub mod thresholds;
pub mod types;
pub mod weights;

pub use alerts::{evaluate_delta_and_alerts, DeltaReport};
pub use composite::{
    calculate_weighted_index, compute_category_index, compute_overall_index, WeightedInput,
};
pub use config::IndexConfig;
pub use engine::{BatchJob, KpiEngine, SnapshotInput};
pub use error::{ConfigError, ConfigResult};
pub use normalize::NormalizationStrategy;
pub use thresholds::{AlertThresholds, OutOfStockThresholds};
pub use types::{
    Alert, AlertCode, AlertSeverity, AlertSubject, Category, CategoryIndex, Granularity,
    IndexComponent, Metric, Period, Snapshot, SnapshotKey, NEUTRAL_INDEX,
};
pub use weights::{CategoryTable, CategoryTables, CategoryWeights, ComponentRule};
