use async_trait::async_trait;
use pulse_index::Metric;

use crate::types::SnapshotRequest;
use crate::util;

/// Supplies the raw metrics for one store and period.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Decide if this source should run for the given request.
    fn enable(&self, _request: &SnapshotRequest) -> bool {
        true
    }

    /// Fetch metrics for the given request.
    async fn get_metrics(&self, request: &SnapshotRequest) -> Result<Vec<Metric>, String>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
