//! In-process version store
//!
//! Backs tests and offline replay. Holds exactly what the HTTP store would:
//! per-thread version maps and the last persisted snapshot.

use crate::error::StoreError;
use crate::snapshot::StateSnapshot;
use crate::{VersionListing, VersionStore};
use async_trait::async_trait;
use easel_artifact::ArtifactVersion;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct ThreadRecord {
    versions: BTreeMap<u32, ArtifactVersion>,
    snapshot: Option<StateSnapshot>,
}

/// In-memory [`VersionStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    threads: RwLock<HashMap<String, ThreadRecord>>,
}

impl MemoryVersionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a thread with existing versions
    pub fn seed_versions(&self, thread_id: &str, versions: Vec<ArtifactVersion>) {
        let mut threads = self.threads.write();
        let record = threads.entry(thread_id.to_string()).or_default();
        for v in versions {
            record.versions.insert(v.index(), v);
        }
    }

    /// Last snapshot persisted for a thread, if any
    #[must_use]
    pub fn snapshot(&self, thread_id: &str) -> Option<StateSnapshot> {
        self.threads
            .read()
            .get(thread_id)
            .and_then(|r| r.snapshot.clone())
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn list_versions(&self, thread_id: &str) -> Result<VersionListing, StoreError> {
        let threads = self.threads.read();
        let record = threads.get(thread_id);
        let indices: Vec<u32> = record
            .map(|r| r.versions.keys().copied().collect())
            .unwrap_or_default();
        Ok(VersionListing {
            total: indices.len(),
            indices,
        })
    }

    async fn fetch_version(
        &self,
        thread_id: &str,
        index: u32,
    ) -> Result<ArtifactVersion, StoreError> {
        self.threads
            .read()
            .get(thread_id)
            .and_then(|r| r.versions.get(&index).cloned())
            .ok_or(StoreError::VersionNotFound { index })
    }

    async fn persist_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let mut threads = self.threads.write();
        let record = threads.entry(snapshot.thread_id.clone()).or_default();
        if let Some(artifact) = &snapshot.artifact {
            // mirror the versions the snapshot carries
            for index in artifact.metadata().known {
                if let Some(v) = artifact.version(index) {
                    record.versions.insert(index, v.clone());
                }
            }
        }
        record.snapshot = Some(snapshot.clone());
        Ok(())
    }
}
