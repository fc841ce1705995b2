use std::collections::BTreeMap;
use std::sync::Arc;

use pulse_index::{IndexConfig, KpiEngine, Metric, Snapshot, SnapshotInput};
use tokio::task::JoinSet;

use crate::components::alert_log_side_effect::AlertLogSideEffect;
use crate::components::csv_metric_source::CsvMetricSource;
use crate::error::{PipelineError, PipelineResult};
use crate::metric_loader::MetricRecord;
use crate::side_effect::{SideEffect, SideEffectInput};
use crate::source::MetricSource;
use crate::store::{MemorySnapshotStore, SnapshotStore};
use crate::types::SnapshotRequest;

/// The periodic snapshot pipeline.
///
/// Pipeline flow for one request:
/// 1. Every enabled MetricSource contributes metrics (later sources win on
///    duplicate keys)
/// 2. The SnapshotStore supplies the previous snapshot, if any
/// 3. KpiEngine scores the period and evaluates deltas and alerts
/// 4. The snapshot is upserted into the SnapshotStore
/// 5. Side effects run; their failures are logged, never returned
pub struct SnapshotPipeline {
    engine: KpiEngine,
    sources: Vec<Box<dyn MetricSource>>,
    store: Arc<dyn SnapshotStore>,
    side_effects: Arc<Vec<Box<dyn SideEffect>>>,
}

impl SnapshotPipeline {
    /// Create a pipeline over loaded CSV records.
    ///
    /// This is the primary constructor for production use.
    pub fn with_records(
        records: Vec<MetricRecord>,
        config: IndexConfig,
        store: Arc<MemorySnapshotStore>,
    ) -> Self {
        let sources: Vec<Box<dyn MetricSource>> = vec![Box::new(CsvMetricSource::new(records))];

        let side_effects: Arc<Vec<Box<dyn SideEffect>>> =
            Arc::new(vec![Box::new(AlertLogSideEffect)]);

        Self {
            engine: KpiEngine::new(config),
            sources,
            store,
            side_effects,
        }
    }

    /// Assemble a pipeline from explicit components.
    pub fn new(
        engine: KpiEngine,
        sources: Vec<Box<dyn MetricSource>>,
        store: Arc<dyn SnapshotStore>,
        side_effects: Vec<Box<dyn SideEffect>>,
    ) -> Self {
        Self {
            engine,
            sources,
            store,
            side_effects: Arc::new(side_effects),
        }
    }

    pub fn engine(&self) -> &KpiEngine {
        &self.engine
    }

    /// Score one store for one period and persist the result.
    pub async fn execute(&self, request: SnapshotRequest) -> PipelineResult<Snapshot> {
        let request = Arc::new(request);
        let metrics = self.fetch_metrics(&request).await?;
        if metrics.is_empty() {
            log::warn!(
                "request_id={} store={} has no metrics for period_start={}, indices will be neutral",
                request.request_id,
                request.store_id,
                request.period.start
            );
        }

        let previous = self
            .store
            .previous(&request.store_id, request.granularity, request.period.start)
            .await
            .map_err(|reason| {
                PipelineError::Store(format!("{}: {}", self.store.name(), reason))
            })?;
        if let Some(prev) = &previous {
            let expected = request.granularity.previous_period_start(request.period.start);
            if prev.period_start != expected {
                log::info!(
                    "request_id={} store={} comparing against {} instead of {}, periods are missing",
                    request.request_id,
                    request.store_id,
                    prev.period_start,
                    expected
                );
            }
        }

        let input = SnapshotInput {
            store_id: request.store_id.clone(),
            period: request.period,
            granularity: request.granularity,
            metrics,
        };
        let snapshot = self
            .engine
            .compute_snapshot(&input, previous.as_ref(), request.requested_at);

        self.store
            .upsert(snapshot.clone())
            .await
            .map_err(|reason| {
                PipelineError::Store(format!("{}: {}", self.store.name(), reason))
            })?;

        log::info!(
            "request_id={} store={} period_start={} overall={:.0} delta={:+.0} alerts={}",
            request.request_id,
            snapshot.store_id,
            snapshot.period_start,
            snapshot.overall_index,
            snapshot.overall_delta,
            snapshot.alerts.len()
        );

        self.run_side_effects(Arc::clone(&request), &snapshot).await;
        Ok(snapshot)
    }

    /// Execute many requests.
    ///
    /// Stores run concurrently; within one store requests run in period
    /// order so each period sees the one before it. The result is sorted by
    /// store then period start. The first failure aborts the whole run.
    pub async fn execute_all(
        self: &Arc<Self>,
        requests: Vec<SnapshotRequest>,
    ) -> PipelineResult<Vec<Snapshot>> {
        let mut by_store: BTreeMap<String, Vec<SnapshotRequest>> = BTreeMap::new();
        for request in requests {
            by_store
                .entry(request.store_id.clone())
                .or_default()
                .push(request);
        }

        let mut tasks = JoinSet::new();
        for (_, mut chain) in by_store {
            chain.sort_by_key(|r| r.period.start);
            let pipeline = Arc::clone(self);
            tasks.spawn(async move {
                let mut snapshots = Vec::with_capacity(chain.len());
                for request in chain {
                    snapshots.push(pipeline.execute(request).await?);
                }
                Ok::<_, PipelineError>(snapshots)
            });
        }

        let mut all = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            all.extend(joined??);
        }
        all.sort_by(|a, b| {
            (a.store_id.as_str(), a.period_start).cmp(&(b.store_id.as_str(), b.period_start))
        });
        Ok(all)
    }

    async fn fetch_metrics(&self, request: &SnapshotRequest) -> PipelineResult<Vec<Metric>> {
        let mut metrics = Vec::new();
        for source in self.sources.iter().filter(|s| s.enable(request)) {
            let fetched = source
                .get_metrics(request)
                .await
                .map_err(|reason| PipelineError::Source {
                    name: source.name().to_string(),
                    reason,
                })?;
            metrics.extend(fetched);
        }
        Ok(metrics)
    }

    async fn run_side_effects(&self, request: Arc<SnapshotRequest>, snapshot: &Snapshot) {
        let input = Arc::new(SideEffectInput {
            request: Arc::clone(&request),
            snapshot: snapshot.clone(),
        });
        for side_effect in self.side_effects.iter() {
            if !side_effect.enable(Arc::clone(&request)) {
                continue;
            }
            if let Err(reason) = side_effect.run(Arc::clone(&input)).await {
                log::warn!(
                    "request_id={} side effect {} failed: {}",
                    request.request_id,
                    side_effect.name(),
                    reason
                );
            }
        }
    }
}
