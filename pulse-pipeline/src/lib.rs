//! Async boundary around the KPI index engine.
//!
//! Metric sources feed the engine, snapshot stores supply the previous
//! period and persist the result, and side effects react to it.

pub mod components;
pub mod error;
pub mod metric_loader;
pub mod pipelines;
pub mod side_effect;
pub mod source;
pub mod store;
pub mod types;
pub mod util;

pub use error::{PipelineError, PipelineResult};
pub use pipelines::snapshot_pipeline::SnapshotPipeline;
pub use store::{MemorySnapshotStore, SnapshotStore};
pub use types::SnapshotRequest;
