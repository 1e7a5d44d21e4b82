//! Easel version store
//!
//! The durable mirror of session state. During an active stream the
//! in-memory session owns the truth; this layer only catches up with it.
//!
//! # Core Concepts
//!
//! - [`VersionStore`]: the seam the engine talks through
//! - [`HttpVersionStore`]: REST-shaped client for the hosted store
//! - [`MemoryVersionStore`]: in-process mirror for tests and replay
//! - [`StateSnapshot`] / [`SaveFingerprint`]: what gets persisted, and the
//!   cheap comparison that suppresses no-op writes

#![warn(unreachable_pub)]

mod error;
mod http;
mod memory;
mod snapshot;

use async_trait::async_trait;
use easel_artifact::ArtifactVersion;
use serde::{Deserialize, Serialize};

pub use error::StoreError;
pub use http::HttpVersionStore;
pub use memory::MemoryVersionStore;
pub use snapshot::{SaveFingerprint, StateSnapshot};

/// Server listing of a thread's artifact versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListing {
    /// Indices that exist server-side
    pub indices: Vec<u32>,
    /// Total version count; may exceed `indices.len()` during backfill
    pub total: usize,
}

/// The seam between the session engine and durable storage
///
/// Implementations must be safe to call from independent tasks; the engine
/// discards results that arrive after a thread switch, so implementations
/// need no staleness handling of their own.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// List the version indices and totals for a thread
    async fn list_versions(&self, thread_id: &str) -> Result<VersionListing, StoreError>;

    /// Fetch one content version
    ///
    /// # Errors
    /// [`StoreError::VersionNotFound`] when the server has no such index.
    async fn fetch_version(
        &self,
        thread_id: &str,
        index: u32,
    ) -> Result<ArtifactVersion, StoreError>;

    /// Persist the session's current state
    async fn persist_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
