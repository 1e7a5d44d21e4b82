//! Transcript message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel run key for progress entries filed before the run id is known
pub const PENDING_RUN_KEY: &str = "__pending_run__";

/// Role-specific message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum MessageBody {
    /// User-authored message
    #[serde(rename_all = "camelCase")]
    Human {
        /// Message text
        content: String,
    },
    /// Assistant-authored message
    #[serde(rename_all = "camelCase")]
    Assistant {
        /// Message text; grows while streaming
        content: String,
        /// True while tokens are still arriving
        streaming: bool,
    },
    /// Ephemeral reasoning trace, dropped at reconciliation
    #[serde(rename_all = "camelCase")]
    Thinking {
        /// Trace text; replaced wholesale on every update
        content: String,
        /// Owning run
        run_id: String,
    },
    /// Placeholder linking to the web-search side panel
    #[serde(rename_all = "camelCase")]
    WebSearchResult {
        /// Query, once known
        query: Option<String>,
        /// Result count, once the search finished
        result_count: Option<usize>,
    },
    /// Ephemeral status of an in-flight operation node
    #[serde(rename_all = "camelCase")]
    NodeProgress {
        /// Operation node name
        node: String,
        /// Owning run, or [`PENDING_RUN_KEY`]
        run_id: String,
        /// Short status text
        status: String,
    },
}

/// One transcript entry with a stable identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable unique identifier
    pub id: String,
    /// Role-specific payload
    #[serde(flatten)]
    pub body: MessageBody,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message with a fresh generated id
    #[must_use]
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            body,
            created_at: Utc::now(),
        }
    }

    /// Build a message with a caller-supplied id
    ///
    /// An empty or whitespace id is replaced with a generated one before it
    /// can ever be compared against the list.
    #[must_use]
    pub fn with_id(id: impl Into<String>, body: MessageBody) -> Self {
        let id = id.into();
        let id = if id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            id
        };
        Self {
            id,
            body,
            created_at: Utc::now(),
        }
    }

    /// Human message helper
    #[must_use]
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageBody::Human {
            content: content.into(),
        })
    }

    /// Streaming assistant message helper
    #[must_use]
    pub fn assistant_streaming(content: impl Into<String>) -> Self {
        Self::new(MessageBody::Assistant {
            content: content.into(),
            streaming: true,
        })
    }

    /// Progress entry keyed by node and run
    #[must_use]
    pub fn node_progress(
        node: impl Into<String>,
        run_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self::new(MessageBody::NodeProgress {
            node: node.into(),
            run_id: run_id.into(),
            status: status.into(),
        })
    }

    /// Displayed text content, if this variant has one
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Human { content }
            | MessageBody::Assistant { content, .. }
            | MessageBody::Thinking { content, .. } => Some(content),
            MessageBody::WebSearchResult { .. } => None,
            MessageBody::NodeProgress { status, .. } => Some(status),
        }
    }

    /// Composite `(node, run)` identity for progress entries
    #[must_use]
    pub fn progress_key(&self) -> Option<(&str, &str)> {
        match &self.body {
            MessageBody::NodeProgress { node, run_id, .. } => Some((node, run_id)),
            _ => None,
        }
    }

    /// True for entries that never survive end-of-stream reconciliation
    #[inline]
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self.body,
            MessageBody::Thinking { .. } | MessageBody::NodeProgress { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_id_is_replaced_before_any_comparison() {
        let m = Message::with_id("   ", MessageBody::Human { content: "hi".into() });
        assert!(!m.id.trim().is_empty());
        assert_ne!(m.id, "   ");
    }

    #[test]
    fn explicit_id_is_kept() {
        let m = Message::with_id("msg-1", MessageBody::Human { content: "hi".into() });
        assert_eq!(m.id, "msg-1");
    }

    #[test]
    fn progress_key_only_for_node_progress() {
        let p = Message::node_progress("webSearch", PENDING_RUN_KEY, "searching");
        assert_eq!(p.progress_key(), Some(("webSearch", PENDING_RUN_KEY)));
        assert_eq!(Message::human("x").progress_key(), None);
    }

    #[test]
    fn ephemeral_variants() {
        assert!(Message::node_progress("n", "r", "s").is_ephemeral());
        assert!(Message::new(MessageBody::Thinking {
            content: "t".into(),
            run_id: "r".into()
        })
        .is_ephemeral());
        assert!(!Message::human("x").is_ephemeral());
    }

    #[test]
    fn wire_shape_is_flat_and_camel_case() {
        let m = Message::with_id(
            "m1",
            MessageBody::WebSearchResult {
                query: Some("rust".into()),
                result_count: Some(3),
            },
        );
        let wire = serde_json::to_value(&m).unwrap();
        assert_eq!(wire["id"], "m1");
        assert_eq!(wire["role"], "webSearchResult");
        assert_eq!(wire["resultCount"], 3);
    }
}
