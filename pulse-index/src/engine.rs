//! Snapshot assembly.
//!
//! `KpiEngine` holds a read-only configuration and turns one store's metrics
//! into a fully populated `Snapshot`. It never reads the clock or touches
//! storage: `created_at` and the previous snapshot come from the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::alerts::evaluate_delta_and_alerts;
use crate::composite::{compute_category_index, compute_overall_index};
use crate::config::IndexConfig;
use crate::types::{Category, CategoryIndex, Granularity, Metric, Period, Snapshot};

/// Everything needed to score one store for one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInput {
    pub store_id: String,
    pub period: Period,
    pub granularity: Granularity,
    pub metrics: Vec<Metric>,
}

/// A batch entry: the input plus the previous snapshot the caller fetched.
#[derive(Clone, Debug)]
pub struct BatchJob {
    pub input: SnapshotInput,
    pub previous: Option<Snapshot>,
}

#[derive(Clone, Debug, Default)]
pub struct KpiEngine {
    config: Arc<IndexConfig>,
}

impl KpiEngine {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Share one configuration between several engines or threads.
    pub fn with_shared_config(config: Arc<IndexConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// One `CategoryIndex` per category, in declaration order.
    pub fn compute_categories(&self, metrics: &[Metric]) -> Vec<CategoryIndex> {
        Category::ALL
            .iter()
            .map(|&category| {
                compute_category_index(category, metrics, self.config.categories.table(category))
            })
            .collect()
    }

    /// Score `input` and evaluate it against `previous`.
    pub fn compute_snapshot(
        &self,
        input: &SnapshotInput,
        previous: Option<&Snapshot>,
        created_at: DateTime<Utc>,
    ) -> Snapshot {
        let category_indices = self.compute_categories(&input.metrics);
        let overall_index = compute_overall_index(&category_indices, &self.config.category_weights);

        let mut snapshot = Snapshot {
            store_id: input.store_id.clone(),
            period_start: input.period.start,
            period_end: input.period.end,
            granularity: input.granularity,
            category_indices,
            overall_index,
            deltas: BTreeMap::new(),
            overall_delta: 0.0,
            alerts: Vec::new(),
            created_at,
        };
        let report = evaluate_delta_and_alerts(&snapshot, previous, &self.config.thresholds);
        snapshot.apply_delta_report(report);
        snapshot
    }

    /// Score many stores in parallel. Output order matches `jobs`.
    pub fn compute_batch(&self, jobs: &[BatchJob], created_at: DateTime<Utc>) -> Vec<Snapshot> {
        jobs.par_iter()
            .map(|job| self.compute_snapshot(&job.input, job.previous.as_ref(), created_at))
            .collect()
    }
}
