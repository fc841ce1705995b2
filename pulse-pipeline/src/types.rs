use chrono::{DateTime, Utc};
use pulse_index::{Granularity, Period};

/// One unit of work: score a single store for a single period.
#[derive(Clone, Debug)]
pub struct SnapshotRequest {
    pub request_id: String,
    pub store_id: String,
    pub period: Period,
    pub granularity: Granularity,
    /// Stamped onto the resulting snapshot. Supplied by the caller so runs
    /// are reproducible.
    pub requested_at: DateTime<Utc>,
}

impl SnapshotRequest {
    pub fn new(
        request_id: impl Into<String>,
        store_id: impl Into<String>,
        period: Period,
        granularity: Granularity,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            store_id: store_id.into(),
            period,
            granularity,
            requested_at,
        }
    }
}
