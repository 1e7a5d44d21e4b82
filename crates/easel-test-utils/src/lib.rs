//! Testing utilities for the easel workspace
//!
//! Shared fixtures: a counting/fault-injecting store wrapper and builders
//! for stream frames.

#![allow(missing_docs)]

use async_trait::async_trait;
use easel_artifact::ArtifactVersion;
use easel_store::{MemoryVersionStore, StateSnapshot, StoreError, VersionListing, VersionStore};
use futures::stream;
use futures::Stream;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Store wrapper that counts calls and can fail persistence on demand
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryVersionStore,
    fetches: AtomicUsize,
    listings: AtomicUsize,
    persists: AtomicUsize,
    fail_persist: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_versions(&self, thread_id: &str, versions: Vec<ArtifactVersion>) {
        self.inner.seed_versions(thread_id, versions);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }

    /// Make every persist fail until turned off again
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, thread_id: &str) -> Option<StateSnapshot> {
        self.inner.snapshot(thread_id)
    }
}

#[async_trait]
impl VersionStore for CountingStore {
    async fn list_versions(&self, thread_id: &str) -> Result<VersionListing, StoreError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_versions(thread_id).await
    }

    async fn fetch_version(
        &self,
        thread_id: &str,
        index: u32,
    ) -> Result<ArtifactVersion, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_version(thread_id, index).await
    }

    async fn persist_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("injected persist failure".into()));
        }
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist_state(snapshot).await
    }
}

// --- frame builders ---

pub fn start_frame(node: &str) -> Value {
    json!({"event": "start", "name": node, "data": {}})
}

pub fn token_frame(node: &str, text: &str) -> Value {
    json!({"event": "token", "name": node, "data": text})
}

pub fn token_frame_with_run(node: &str, text: &str, run_id: &str) -> Value {
    json!({"event": "token", "name": node, "data": text, "runId": run_id})
}

pub fn block_token_frame(node: &str, text: &str) -> Value {
    json!({"event": "token", "name": node, "data": [{"type": "text", "text": text, "index": 0}]})
}

pub fn json_delta_frame(node: &str, fragment: &str) -> Value {
    json!({"event": "token", "name": node, "data": [{"type": "input_json_delta", "partial_json": fragment}]})
}

pub fn end_frame(node: &str) -> Value {
    json!({"event": "end", "name": node, "data": {}})
}

pub fn end_frame_with(node: &str, data: Value) -> Value {
    json!({"event": "end", "name": node, "data": data})
}

pub fn error_frame(node: &str, message: &str) -> Value {
    json!({"event": "error", "name": node, "data": {"error": message}})
}

pub fn done_frame() -> Value {
    json!({"event": "done"})
}

/// Turn frames into the stream shape the engine consumes
pub fn frame_stream(frames: Vec<Value>) -> impl Stream<Item = Result<Value, StoreError>> {
    stream::iter(frames.into_iter().map(Ok))
}

/// A stream that fails mid-way with a transport error
pub fn failing_frame_stream(
    frames: Vec<Value>,
    message: &str,
) -> impl Stream<Item = Result<Value, StoreError>> {
    let failure = StoreError::Transport(message.to_string());
    stream::iter(
        frames
            .into_iter()
            .map(Ok)
            .chain(std::iter::once(Err(failure))),
    )
}

pub fn text_version(index: u32, title: &str, content: &str) -> ArtifactVersion {
    ArtifactVersion::text(index, title, content)
}
