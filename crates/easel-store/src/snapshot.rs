//! State snapshots and save fingerprints

use chrono::{DateTime, Utc};
use easel_artifact::Artifact;
use easel_chat::Message;
use serde::{Deserialize, Serialize};

/// What gets persisted for a thread: the transcript and the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Owning thread
    pub thread_id: String,
    /// Transcript in display order
    pub messages: Vec<Message>,
    /// Artifact with its loaded versions, if one exists
    pub artifact: Option<Artifact>,
    /// When this snapshot was taken
    pub saved_at: DateTime<Utc>,
}

impl StateSnapshot {
    /// Snapshot the given state now
    #[must_use]
    pub fn new(thread_id: impl Into<String>, messages: Vec<Message>, artifact: Option<Artifact>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
            artifact,
            saved_at: Utc::now(),
        }
    }

    /// Fingerprint of the semantically relevant fields
    ///
    /// Covers the current version only, not the whole version graph: two
    /// snapshots that differ only in lazily fetched history compare equal,
    /// and no write is issued for them.
    #[must_use]
    pub fn fingerprint(&self) -> SaveFingerprint {
        let current = self.artifact.as_ref().and_then(Artifact::current);
        SaveFingerprint {
            thread_id: self.thread_id.clone(),
            current_index: self.artifact.as_ref().map(Artifact::current_index),
            title: current.map(|v| v.title().to_string()),
            content: current.map(|v| v.content().to_string()),
            message_count: self.messages.len(),
        }
    }
}

/// Cheap equality proxy for "would this save change anything"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFingerprint {
    thread_id: String,
    current_index: Option<u32>,
    title: Option<String>,
    content: Option<String>,
    message_count: usize,
}
