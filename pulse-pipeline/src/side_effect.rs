use async_trait::async_trait;
use pulse_index::Snapshot;
use std::sync::Arc;

use crate::types::SnapshotRequest;
use crate::util;

/// Input provided to side effects after a snapshot has been persisted.
#[derive(Clone)]
pub struct SideEffectInput {
    pub request: Arc<SnapshotRequest>,
    pub snapshot: Snapshot,
}

/// A side effect is an action that runs after the snapshot is stored and
/// does not affect the pipeline result. Examples: alert fan-out, caching.
#[async_trait]
pub trait SideEffect: Send + Sync {
    /// Decide if this side effect should run.
    fn enable(&self, _request: Arc<SnapshotRequest>) -> bool {
        true
    }

    /// Execute the side effect.
    async fn run(&self, input: Arc<SideEffectInput>) -> Result<(), String>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
