//! Event demuxer
//!
//! Tags every normalized event with its operation, its run identity and
//! whether it is the first token the node has produced in this run. Run ids
//! are assigned lazily by the service: events that arrive before the id is
//! known carry [`RunTag::Pending`], and the event on which the id first
//! appears exposes it via [`DemuxedEvent::resolved_run`] so downstream state
//! can re-key anything filed under the placeholder.

use crate::accum::{extract_json_delta, extract_text};
use crate::event::{Phase, StreamEvent};
use crate::op::Operation;
use serde_json::Value;
use std::collections::HashSet;

/// Sentinel key used for state filed before the run id is known
pub const PENDING_RUN_KEY: &str = "__pending_run__";

/// Run identity of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTag {
    /// Run id not yet announced by the service
    Pending,
    /// Known run id
    Known(String),
}

impl RunTag {
    /// Stable key for maps and composite message identities
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Pending => PENDING_RUN_KEY,
            Self::Known(id) => id,
        }
    }
}

/// One classified event, ready for the reducer
#[derive(Debug, Clone)]
pub struct DemuxedEvent {
    /// Operation the node performs
    pub op: Operation,
    /// Wire node name
    pub node: String,
    /// Lifecycle phase
    pub phase: Phase,
    /// Run identity at the time of this event
    pub run: RunTag,
    /// True for the first token this node produced in the run
    pub first_token: bool,
    /// Set on the single event where the run id became known
    pub resolved_run: Option<String>,
    /// Raw payload, untouched
    pub payload: Value,
}

/// Stream demuxer
///
/// One instance per consumed stream. Tracks the lazily assigned run id and
/// which nodes have already produced tokens.
#[derive(Debug, Default)]
pub struct Demuxer {
    run_id: Option<String>,
    tokens_seen: HashSet<String>,
}

impl Demuxer {
    /// Create a demuxer for a fresh stream
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run id, once known
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Classify one event
    ///
    /// Returns `None` for nodes outside the engine's vocabulary; those
    /// events are logged and dropped.
    pub fn classify(&mut self, event: StreamEvent) -> Option<DemuxedEvent> {
        let Some(op) = Operation::from_node(&event.node) else {
            tracing::debug!(node = %event.node, "skipping event for unknown node");
            return None;
        };

        let mut resolved_run = None;
        if self.run_id.is_none() {
            if let Some(id) = event.run_id {
                tracing::debug!(run_id = %id, node = %event.node, "run id resolved");
                self.run_id = Some(id.clone());
                resolved_run = Some(id);
            }
        }

        let run = match &self.run_id {
            Some(id) => RunTag::Known(id.clone()),
            None => RunTag::Pending,
        };

        // an empty chunk must not consume a node's first-token slot
        let has_content = !extract_text(&event.payload).is_empty()
            || extract_json_delta(&event.payload).is_some();
        let first_token = event.phase == Phase::Token
            && has_content
            && self.tokens_seen.insert(event.node.clone());

        Some(DemuxedEvent {
            op,
            node: event.node,
            phase: event.phase,
            run,
            first_token,
            resolved_run,
            payload: event.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(node: &str, run_id: Option<&str>) -> StreamEvent {
        StreamEvent {
            phase: Phase::Token,
            node: node.to_string(),
            run_id: run_id.map(str::to_string),
            payload: json!("x"),
        }
    }

    #[test]
    fn first_token_flag_per_node() {
        let mut demux = Demuxer::new();
        let a = demux.classify(token("generateArtifact", None)).unwrap();
        let b = demux.classify(token("generateArtifact", None)).unwrap();
        assert!(a.first_token);
        assert!(!b.first_token);
    }

    #[test]
    fn first_token_tracked_independently_per_node() {
        let mut demux = Demuxer::new();
        demux.classify(token("generateArtifact", None)).unwrap();
        let reply = demux.classify(token("generateFollowup", None)).unwrap();
        assert!(reply.first_token);
    }

    #[test]
    fn run_id_resolves_once_and_sticks() {
        let mut demux = Demuxer::new();
        let before = demux.classify(token("generateArtifact", None)).unwrap();
        assert_eq!(before.run, RunTag::Pending);
        assert_eq!(before.run.key(), PENDING_RUN_KEY);

        let at = demux.classify(token("generateArtifact", Some("r-9"))).unwrap();
        assert_eq!(at.resolved_run.as_deref(), Some("r-9"));
        assert_eq!(at.run, RunTag::Known("r-9".to_string()));

        let after = demux.classify(token("generateArtifact", Some("r-9"))).unwrap();
        assert_eq!(after.resolved_run, None);
        assert_eq!(after.run.key(), "r-9");
    }

    #[test]
    fn unknown_node_dropped() {
        let mut demux = Demuxer::new();
        assert!(demux.classify(token("mysteryNode", None)).is_none());
    }

    #[test]
    fn empty_token_does_not_consume_first_slot() {
        let mut demux = Demuxer::new();
        let empty = demux
            .classify(StreamEvent {
                phase: Phase::Token,
                node: "generateArtifact".to_string(),
                run_id: None,
                payload: json!(""),
            })
            .unwrap();
        assert!(!empty.first_token);

        let real = demux.classify(token("generateArtifact", None)).unwrap();
        assert!(real.first_token);
    }

    #[test]
    fn start_phase_is_not_a_first_token() {
        let mut demux = Demuxer::new();
        let ev = demux
            .classify(StreamEvent {
                phase: Phase::Start,
                node: "generateArtifact".to_string(),
                run_id: None,
                payload: Value::Null,
            })
            .unwrap();
        assert!(!ev.first_token);
    }
}
