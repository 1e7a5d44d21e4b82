//! Post-stream enrichment
//!
//! Background work that improves a thread without blocking interaction.
//! Results apply only if the session epoch is unchanged; failures are
//! logged and swallowed.

use crate::state::SessionState;
use easel_chat::{MessageBody, MessageList};
use parking_lot::RwLock;
use std::sync::Arc;

const TITLE_MAX_WORDS: usize = 8;

/// Derive a thread title from the opening human message
pub(crate) fn derive_title(messages: &MessageList) -> Option<String> {
    let first_human = messages
        .iter()
        .find(|m| matches!(m.body, MessageBody::Human { .. }))?;
    let content = first_human.content()?;
    let words: Vec<&str> = content.split_whitespace().take(TITLE_MAX_WORDS + 1).collect();
    if words.is_empty() {
        return None;
    }
    let mut title = words[..words.len().min(TITLE_MAX_WORDS)].join(" ");
    if words.len() > TITLE_MAX_WORDS {
        title.push('…');
    }
    Some(title)
}

/// Spawn the title-enrichment task for a freshly reconciled stream
///
/// Only the first exchange on a thread gets a title: transcripts longer
/// than one human/assistant pair are skipped, as is any thread that
/// already has one.
pub(crate) fn spawn_title_enrichment(state: Arc<RwLock<SessionState>>, epoch: u64) {
    tokio::spawn(async move {
        let candidate = {
            let s = state.read();
            if s.epoch != epoch || s.thread_title.is_some() || s.messages.len() > 2 {
                return;
            }
            derive_title(&s.messages)
        };
        let Some(title) = candidate else { return };

        let mut s = state.write();
        if s.epoch == epoch && s.thread_title.is_none() {
            tracing::debug!(%title, "applying derived thread title");
            s.thread_title = Some(title);
        }
    });
}
