use async_trait::async_trait;
use pulse_index::AlertSeverity;
use std::sync::Arc;

use crate::side_effect::{SideEffect, SideEffectInput};

/// Writes every alert on a stored snapshot to the log.
///
/// Critical alerts go to `error`, warnings to `warn`. In production this is
/// where notifications would fan out.
pub struct AlertLogSideEffect;

#[async_trait]
impl SideEffect for AlertLogSideEffect {
    async fn run(&self, input: Arc<SideEffectInput>) -> Result<(), String> {
        let snapshot = &input.snapshot;
        for alert in &snapshot.alerts {
            match alert.severity {
                AlertSeverity::Critical => log::error!(
                    "request_id={} store={} period_start={} {}",
                    input.request.request_id,
                    snapshot.store_id,
                    snapshot.period_start,
                    alert.message
                ),
                AlertSeverity::Warning => log::warn!(
                    "request_id={} store={} period_start={} {}",
                    input.request.request_id,
                    snapshot.store_id,
                    snapshot.period_start,
                    alert.message
                ),
            }
        }
        log::info!(
            "request_id={} store={} overall={:.0} with {} alerts",
            input.request.request_id,
            snapshot.store_id,
            snapshot.overall_index,
            snapshot.alerts.len()
        );
        Ok(())
    }
}
