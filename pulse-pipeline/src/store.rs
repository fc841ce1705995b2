//! Snapshot persistence.
//!
//! Snapshots are keyed by (store, period start, granularity). Writing the
//! same key twice replaces the earlier snapshot, so re-running a period is
//! idempotent.

use async_trait::async_trait;
use chrono::NaiveDate;
use pulse_index::{Granularity, Snapshot, SnapshotKey};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use crate::error::{PipelineError, PipelineResult};
use crate::util;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent snapshot for `store_id` and `granularity` whose period
    /// starts strictly before `before`.
    async fn previous(
        &self,
        store_id: &str,
        granularity: Granularity,
        before: NaiveDate,
    ) -> Result<Option<Snapshot>, String>;

    /// Insert or replace the snapshot under its key.
    async fn upsert(&self, snapshot: Snapshot) -> Result<(), String>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// In-process store, optionally backed by a JSON file.
///
/// Uses a `RwLock` so concurrent pipeline tasks can look up previous
/// snapshots while another task writes.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<SnapshotKey, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing snapshots. Later duplicates win.
    pub fn with_snapshots(snapshots: Vec<Snapshot>) -> Self {
        let map = snapshots.into_iter().map(|s| (s.key(), s)).collect();
        Self {
            snapshots: RwLock::new(map),
        }
    }

    /// Load a JSON array of snapshots. A missing file yields an empty store.
    pub fn load_json(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no snapshot file at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshots: Vec<Snapshot> = serde_json::from_str(&raw)?;
        log::info!(
            "loaded {} snapshots from {}",
            snapshots.len(),
            path.display()
        );
        Ok(Self::with_snapshots(snapshots))
    }

    /// Write every snapshot as a pretty-printed JSON array, in key order.
    pub fn save_json(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshots())?;
        std::fs::write(path, json).map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// All snapshots in key order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        let map = self.snapshots.read().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot store read lock was poisoned, recovering");
            poisoned.into_inner()
        });
        map.values().cloned().collect()
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<Snapshot> {
        let map = self.snapshots.read().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot store read lock was poisoned, recovering");
            poisoned.into_inner()
        });
        map.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        let map = self.snapshots.read().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot store read lock was poisoned, recovering");
            poisoned.into_inner()
        });
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn previous(
        &self,
        store_id: &str,
        granularity: Granularity,
        before: NaiveDate,
    ) -> Result<Option<Snapshot>, String> {
        let map = self.snapshots.read().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot store read lock was poisoned, recovering");
            poisoned.into_inner()
        });
        Ok(map
            .values()
            .filter(|s| {
                s.store_id == store_id && s.granularity == granularity && s.period_start < before
            })
            .max_by_key(|s| s.period_start)
            .cloned())
    }

    async fn upsert(&self, snapshot: Snapshot) -> Result<(), String> {
        let mut map = self.snapshots.write().unwrap_or_else(|poisoned| {
            log::warn!("Snapshot store write lock was poisoned, recovering");
            poisoned.into_inner()
        });
        if map.insert(snapshot.key(), snapshot).is_some() {
            log::debug!("replaced existing snapshot");
        }
        Ok(())
    }
}
