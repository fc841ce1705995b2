use async_trait::async_trait;
use pulse_index::Metric;

use crate::metric_loader::MetricRecord;
use crate::source::MetricSource;
use crate::types::SnapshotRequest;

/// Source that serves metrics from records loaded out of a CSV file.
///
/// A record matches a request when its store and period start agree. Periods
/// are matched on start date only; the granularity is the caller's concern.
pub struct CsvMetricSource {
    records: Vec<MetricRecord>,
}

impl CsvMetricSource {
    pub fn new(records: Vec<MetricRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl MetricSource for CsvMetricSource {
    fn enable(&self, _request: &SnapshotRequest) -> bool {
        !self.records.is_empty()
    }

    async fn get_metrics(&self, request: &SnapshotRequest) -> Result<Vec<Metric>, String> {
        let metrics: Vec<Metric> = self
            .records
            .iter()
            .filter(|r| r.store_id == request.store_id && r.period_start == request.period.start)
            .map(MetricRecord::to_metric)
            .collect();
        log::debug!(
            "request_id={} {} metrics for store={} period_start={}",
            request.request_id,
            metrics.len(),
            request.store_id,
            request.period.start
        );
        Ok(metrics)
    }
}
