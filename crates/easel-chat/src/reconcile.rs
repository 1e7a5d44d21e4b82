//! Message reconciliation
//!
//! The transcript is append-ordered but identity-keyed: a message id seen
//! twice merges into the existing entry. Progress entries use a composite
//! `(node, run)` key, and entries filed under the pending-run sentinel are
//! migrated in one pass when the real run id arrives.

use crate::message::{Message, MessageBody, PENDING_RUN_KEY};
use std::collections::HashSet;
use uuid::Uuid;

/// The session transcript
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList {
    items: Vec<Message>,
}

impl MessageList {
    /// Empty transcript
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the transcript is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate entries in display order
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }

    /// Entries as a slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.items
    }

    /// Entry by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.items.iter().find(|m| m.id == id)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total chars across displayed content, for the summarization watermark
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.items
            .iter()
            .filter_map(Message::content)
            .map(|c| c.chars().count())
            .sum()
    }

    /// Insert or merge one message
    ///
    /// Identity resolution order: id, then the `(node, run)` key for
    /// progress entries, then the run id for thinking traces. A blank id is
    /// replaced with a generated one before any comparison. On a match,
    /// streaming assistant content concatenates; every other variant
    /// replaces its body wholesale.
    pub fn upsert(&mut self, mut incoming: Message) {
        if incoming.id.trim().is_empty() {
            incoming.id = Uuid::new_v4().to_string();
        }

        let position = self.position_of(&incoming);
        let Some(position) = position else {
            self.items.push(incoming);
            return;
        };

        let existing = &mut self.items[position];
        match (&mut existing.body, incoming.body) {
            (
                MessageBody::Assistant { content, streaming },
                MessageBody::Assistant {
                    content: delta,
                    streaming: still_streaming,
                },
            ) if *streaming => {
                content.push_str(&delta);
                *streaming = still_streaming;
            }
            (slot, body) => *slot = body,
        }
    }

    fn position_of(&self, incoming: &Message) -> Option<usize> {
        if let Some(i) = self.items.iter().position(|m| m.id == incoming.id) {
            return Some(i);
        }
        if let Some(key) = incoming.progress_key() {
            return self.items.iter().position(|m| m.progress_key() == Some(key));
        }
        if let MessageBody::Thinking { run_id, .. } = &incoming.body {
            return self.items.iter().position(|m| {
                matches!(&m.body, MessageBody::Thinking { run_id: r, .. } if r == run_id)
            });
        }
        None
    }

    /// Migrate every pending-run entry to the resolved run id
    ///
    /// All placeholder-keyed progress and thinking entries move in one
    /// pass, so no later upsert can observe a half-migrated transcript.
    pub fn rekey_pending_run(&mut self, run_id: &str) {
        let mut migrated = 0usize;
        for message in &mut self.items {
            match &mut message.body {
                MessageBody::NodeProgress { run_id: r, .. }
                | MessageBody::Thinking { run_id: r, .. }
                    if r == PENDING_RUN_KEY =>
                {
                    *r = run_id.to_string();
                    migrated += 1;
                }
                _ => {}
            }
        }
        if migrated > 0 {
            tracing::debug!(run_id, migrated, "re-keyed pending-run transcript entries");
        }
    }

    /// End-of-stream reconciliation
    ///
    /// Merges the stream's final message batch, then settles the
    /// transcript:
    /// - a final assistant message whose content is the artifact itself
    ///   (identical, or sharing a prefix of at least `echo_prefix_len`
    ///   chars) is generation traffic, not conversation, and is rejected
    /// - a final human message whose id was already optimistically rendered
    ///   is rejected
    /// - ephemeral entries (thinking, progress) are dropped
    /// - surviving assistant entries stop streaming
    pub fn reconcile_final(
        &mut self,
        final_batch: Vec<Message>,
        artifact_content: Option<&str>,
        optimistic_human_ids: &HashSet<String>,
        echo_prefix_len: usize,
    ) {
        for message in final_batch {
            match &message.body {
                MessageBody::Human { .. } if optimistic_human_ids.contains(&message.id) => {
                    tracing::debug!(id = %message.id, "dropping re-delivered optimistic human message");
                }
                MessageBody::Assistant { content, .. }
                    if artifact_content
                        .is_some_and(|a| is_artifact_echo(content, a, echo_prefix_len)) =>
                {
                    tracing::debug!(id = %message.id, "dropping assistant message that echoes the artifact");
                }
                // a final re-delivery of content already streamed in under a
                // different id is the same message, not a new one
                MessageBody::Assistant { content, .. }
                    if self.items.iter().any(|m| {
                        m.id != message.id
                            && matches!(&m.body, MessageBody::Assistant { content: c, .. } if c == content)
                    }) =>
                {
                    tracing::debug!(id = %message.id, "dropping content-identical assistant re-delivery");
                }
                _ => self.upsert(message),
            }
        }

        self.items.retain(|m| {
            if m.is_ephemeral() {
                return false;
            }
            if let MessageBody::Assistant { content, .. } = &m.body {
                if artifact_content.is_some_and(|a| is_artifact_echo(content, a, echo_prefix_len)) {
                    return false;
                }
            }
            true
        });

        for message in &mut self.items {
            if let MessageBody::Assistant { streaming, .. } = &mut message.body {
                *streaming = false;
            }
        }
    }
}

/// Is `content` the artifact leaking into the transcript?
///
/// Identical strings always count. The prefix rule is a heuristic with a
/// tunable threshold; both sides must reach the threshold before it fires.
fn is_artifact_echo(content: &str, artifact: &str, prefix_len: usize) -> bool {
    if content == artifact {
        return true;
    }
    if prefix_len == 0 {
        return false;
    }
    let common = content
        .chars()
        .zip(artifact.chars())
        .take_while(|(a, b)| a == b)
        .count();
    common >= prefix_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PENDING_RUN_KEY;
    use pretty_assertions::assert_eq;

    fn streaming_assistant(id: &str, content: &str) -> Message {
        Message::with_id(
            id,
            MessageBody::Assistant {
                content: content.into(),
                streaming: true,
            },
        )
    }

    #[test]
    fn duplicate_id_merges_with_concatenated_content() {
        let mut list = MessageList::new();
        list.upsert(streaming_assistant("a1", "Hel"));
        list.upsert(streaming_assistant("a1", "lo"));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("a1").unwrap().content(), Some("Hello"));
    }

    #[test]
    fn non_streaming_duplicate_replaces() {
        let mut list = MessageList::new();
        list.upsert(Message::with_id("h1", MessageBody::Human { content: "one".into() }));
        list.upsert(Message::with_id("h1", MessageBody::Human { content: "two".into() }));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("h1").unwrap().content(), Some("two"));
    }

    #[test]
    fn progress_entries_match_on_composite_key() {
        let mut list = MessageList::new();
        list.upsert(Message::node_progress("webSearch", "r-1", "searching"));
        list.upsert(Message::node_progress("webSearch", "r-1", "3 results"));
        list.upsert(Message::node_progress("webSearch", "r-2", "searching"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn pending_entries_migrate_atomically() {
        let mut list = MessageList::new();
        list.upsert(Message::node_progress("webSearch", PENDING_RUN_KEY, "searching"));
        list.upsert(Message::node_progress("generateArtifact", PENDING_RUN_KEY, "writing"));
        list.rekey_pending_run("r-7");

        let runs: Vec<&str> = list
            .iter()
            .filter_map(|m| m.progress_key())
            .map(|(_, run)| run)
            .collect();
        assert_eq!(runs, vec!["r-7", "r-7"]);

        // an update under the resolved id now lands on the migrated entry
        list.upsert(Message::node_progress("webSearch", "r-7", "done"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn finalize_drops_artifact_echoes() {
        let artifact = "x".repeat(150);
        let mut list = MessageList::new();
        list.upsert(streaming_assistant("a1", &artifact));
        list.reconcile_final(vec![], Some(&artifact), &HashSet::new(), 100);
        assert!(list.is_empty());
    }

    #[test]
    fn finalize_keeps_short_replies_even_when_prefixing_artifact() {
        // a 2-char reply that happens to prefix the artifact is conversation
        let mut list = MessageList::new();
        list.upsert(streaming_assistant("a1", "Ok"));
        list.reconcile_final(vec![], Some("Ok, here is the plan in full..."), &HashSet::new(), 100);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn finalize_rejects_redelivered_optimistic_human() {
        let mut list = MessageList::new();
        let optimistic = Message::with_id("h9", MessageBody::Human { content: "write a poem".into() });
        list.upsert(optimistic.clone());

        let mut ids = HashSet::new();
        ids.insert("h9".to_string());

        list.reconcile_final(
            vec![Message::with_id("h9", MessageBody::Human { content: "write a poem".into() })],
            None,
            &ids,
            100,
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("h9").unwrap().content(), Some("write a poem"));
    }

    #[test]
    fn finalize_merges_content_identical_assistant_redelivery() {
        let mut list = MessageList::new();
        // streamed under a locally generated id
        list.upsert(streaming_assistant("local-1", "Here is a poem."));
        // redelivered at end of stream under the service's id
        list.reconcile_final(
            vec![Message::with_id(
                "svc-9",
                MessageBody::Assistant {
                    content: "Here is a poem.".into(),
                    streaming: false,
                },
            )],
            None,
            &HashSet::new(),
            100,
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn finalize_drops_ephemerals_and_settles_streaming() {
        let mut list = MessageList::new();
        list.upsert(streaming_assistant("a1", "done deal"));
        list.upsert(Message::node_progress("rewriteArtifact", "r-1", "rewriting"));
        list.upsert(Message::new(MessageBody::Thinking {
            content: "hmm".into(),
            run_id: "r-1".into(),
        }));

        list.reconcile_final(vec![], None, &HashSet::new(), 100);

        assert_eq!(list.len(), 1);
        let m = list.get("a1").unwrap();
        assert!(matches!(
            m.body,
            MessageBody::Assistant { streaming: false, .. }
        ));
    }

    #[test]
    fn thinking_replaces_rather_than_concatenates() {
        let mut list = MessageList::new();
        list.upsert(Message::new(MessageBody::Thinking {
            content: "first".into(),
            run_id: "r-1".into(),
        }));
        list.upsert(Message::new(MessageBody::Thinking {
            content: "second".into(),
            run_id: "r-1".into(),
        }));
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().content(), Some("second"));
    }

    #[test]
    fn total_chars_counts_displayed_content() {
        let mut list = MessageList::new();
        list.upsert(Message::with_id("h1", MessageBody::Human { content: "abcd".into() }));
        list.upsert(streaming_assistant("a1", "ef"));
        assert_eq!(list.total_chars(), 6);
    }
}
