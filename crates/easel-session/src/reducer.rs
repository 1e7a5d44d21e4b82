//! Stream reducer
//!
//! Applies one raw frame at a time to the session state. Each frame is
//! fully applied before the next is read, and a frame either applies
//! completely or not at all: a rejected increment leaves the transcript
//! and artifact exactly as they were.

use crate::config::EngineConfig;
use crate::state::SessionState;
use easel_artifact::{Artifact, ArtifactError, ArtifactKind, ArtifactVersion};
use easel_chat::{Message, MessageBody};
use easel_stream::{
    extract_json_delta, extract_text, extract_thinking, Accumulator, DemuxedEvent, Demuxer,
    Frame, HighlightSpan, Operation, Phase,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Per-run inputs the stream itself does not carry
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Highlighted span for scoped patch operations, in char offsets
    pub highlight: Option<HighlightSpan>,
    /// Artifact variant hint for create operations
    pub artifact_kind: Option<ArtifactKind>,
    /// Language hint for created code artifacts
    pub language: Option<String>,
}

impl RunContext {
    /// Context with no hints: create text artifacts, no highlight
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a highlighted span for a scoped patch
    #[inline]
    #[must_use]
    pub fn with_highlight(mut self, span: HighlightSpan) -> Self {
        self.highlight = Some(span);
        self
    }

    /// For a code artifact in the given language
    #[inline]
    #[must_use]
    pub fn for_code(mut self, language: impl Into<String>) -> Self {
        self.artifact_kind = Some(ArtifactKind::Code);
        self.language = Some(language.into());
        self
    }
}

/// What the reducer wants the driver to do next
#[derive(Debug)]
pub(crate) enum Flow {
    /// Keep reading frames
    Continue,
    /// Stream completed normally
    Done,
    /// Stream reported a terminal error
    Failed(String),
}

/// State for one consumed stream
pub(crate) struct StreamRun {
    demux: Demuxer,
    accum: Accumulator,
    ctx: RunContext,
    /// Assistant message id per chat node
    chat_ids: HashMap<String, String>,
    /// Nodes whose first content-bearing token has not been applied yet
    pending_first: HashSet<String>,
    /// Growing reasoning trace, replaced wholesale in the transcript
    thinking: String,
    /// Search placeholder id, once synthesized
    search_id: Option<String>,
    /// Final messages announced by end-of-node frames
    final_batch: Vec<Message>,
}

impl StreamRun {
    pub(crate) fn new(ctx: RunContext) -> Self {
        Self {
            demux: Demuxer::new(),
            accum: Accumulator::new(),
            ctx,
            chat_ids: HashMap::new(),
            pending_first: HashSet::new(),
            thinking: String::new(),
            search_id: None,
            final_batch: Vec::new(),
        }
    }

    /// Apply one raw frame
    ///
    /// Malformed frames are logged and skipped; they never abort the
    /// stream.
    pub(crate) fn apply(
        &mut self,
        state: &mut SessionState,
        raw: &Value,
        config: &EngineConfig,
    ) -> Flow {
        let frame = match Frame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed frame");
                return Flow::Continue;
            }
        };

        let event = match frame {
            Frame::Done => return Flow::Done,
            Frame::Event(event) => event,
        };

        let Some(event) = self.demux.classify(event) else {
            return Flow::Continue;
        };

        if let Some(run_id) = &event.resolved_run {
            state.messages.rekey_pending_run(run_id);
        }

        match event.phase {
            Phase::Error => {
                let message = event
                    .payload
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("generation stream failed")
                    .to_string();
                Flow::Failed(message)
            }
            Phase::Start => {
                self.on_start(state, &event);
                Flow::Continue
            }
            Phase::Token => {
                self.on_token(state, &event, config);
                Flow::Continue
            }
            Phase::End => {
                self.on_end(state, &event);
                Flow::Continue
            }
        }
    }

    fn on_start(&mut self, state: &mut SessionState, event: &DemuxedEvent) {
        if event.op.triggers_search() && self.search_id.is_none() {
            let placeholder = Message::new(MessageBody::WebSearchResult {
                query: None,
                result_count: None,
            });
            self.search_id = Some(placeholder.id.clone());
            state.messages.upsert(placeholder);
        }

        if event.op.writes_artifact() || event.op.triggers_search() {
            state.messages.upsert(Message::node_progress(
                event.node.clone(),
                event.run.key().to_string(),
                "running",
            ));
        }
    }

    fn on_token(&mut self, state: &mut SessionState, event: &DemuxedEvent, config: &EngineConfig) {
        if let Some(trace) = extract_thinking(&event.payload) {
            self.thinking.push_str(&trace);
            state.messages.upsert(Message::new(MessageBody::Thinking {
                content: self.thinking.clone(),
                run_id: event.run.key().to_string(),
            }));
        }

        if event.op.writes_artifact() {
            self.apply_artifact_token(state, event);
        } else if event.op.is_chat() {
            self.apply_chat_token(state, event, config);
        }
    }

    fn apply_artifact_token(&mut self, state: &mut SessionState, event: &DemuxedEvent) {
        if event.op.is_scoped_patch() {
            match (self.ctx.highlight, state.artifact.as_ref().and_then(Artifact::current)) {
                (Some(span), Some(current)) => {
                    self.accum.capture_splice(&event.node, current.content(), span);
                }
                (None, _) => {
                    tracing::warn!(node = %event.node, "scoped patch without a highlighted span");
                }
                _ => {}
            }
        }

        if event.first_token {
            self.pending_first.insert(event.node.clone());
        }

        let snapshot = match extract_json_delta(&event.payload) {
            Some(fragment) => self.accum.push_json(&event.node, &fragment),
            None => {
                let text = extract_text(&event.payload);
                self.accum.push_text(&event.node, &text)
            }
        };
        // an empty or not-yet-parseable chunk mutates nothing; a deferred
        // first token stays pending until content actually lands
        let Some(snapshot) = snapshot else { return };

        let first = self.pending_first.remove(&event.node);
        let incoming = self.build_version(state, &event.node, snapshot);

        if state.artifact.is_none() {
            if first {
                state.artifact = Some(Artifact::new(incoming.with_index(1)));
            } else {
                tracing::warn!(node = %event.node, "dropping increment: no artifact to update");
            }
            return;
        }

        let Some(artifact) = state.artifact.as_mut() else {
            return;
        };
        match artifact.apply_increment(incoming.clone(), first) {
            Ok(_) => {}
            Err(ArtifactError::KindMismatch { .. })
                if event.op == Operation::CreateArtifact && first =>
            {
                // a type change is a logically new artifact
                tracing::info!(kind = %incoming.kind(), "artifact variant changed; starting a new artifact");
                state.artifact = Some(Artifact::new(incoming.with_index(1)));
            }
            Err(e) => {
                tracing::warn!(error = %e, node = %event.node, "dropping artifact increment");
            }
        }
    }

    fn build_version(
        &self,
        state: &SessionState,
        node: &str,
        content: String,
    ) -> ArtifactVersion {
        let current = state.artifact.as_ref().and_then(Artifact::current);
        let kind = state
            .artifact
            .as_ref()
            .and_then(Artifact::kind)
            .or(self.ctx.artifact_kind)
            .unwrap_or(ArtifactKind::Text);
        let title = self
            .accum
            .title(node)
            .or_else(|| current.map(|v| v.title().to_string()))
            .unwrap_or_else(|| "Untitled".to_string());

        match kind {
            ArtifactKind::Text => ArtifactVersion::text(0, title, content),
            ArtifactKind::Code => {
                let language = current
                    .and_then(|v| v.language().map(str::to_string))
                    .or_else(|| self.ctx.language.clone())
                    .unwrap_or_else(|| "plaintext".to_string());
                ArtifactVersion::code(0, title, language, content)
            }
        }
    }

    fn apply_chat_token(
        &mut self,
        state: &mut SessionState,
        event: &DemuxedEvent,
        config: &EngineConfig,
    ) {
        let delta = extract_text(&event.payload);
        if delta.is_empty() {
            return;
        }

        let id = self
            .chat_ids
            .entry(event.node.clone())
            .or_insert_with(|| Message::assistant_streaming("").id)
            .clone();
        state.messages.upsert(Message::with_id(
            id,
            MessageBody::Assistant {
                content: delta,
                streaming: true,
            },
        ));

        state.needs_summarization =
            state.messages.total_chars() > config.transcript_char_ceiling;
    }

    fn on_end(&mut self, state: &mut SessionState, event: &DemuxedEvent) {
        if event.op.triggers_search() {
            if let Some(id) = &self.search_id {
                let results = event
                    .payload
                    .get("results")
                    .and_then(Value::as_array)
                    .map(Vec::len);
                let query = event
                    .payload
                    .get("query")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                state.messages.upsert(Message::with_id(
                    id.clone(),
                    MessageBody::WebSearchResult {
                        query,
                        result_count: results,
                    },
                ));
            }
        }

        if event.op.writes_artifact() || event.op.triggers_search() {
            state.messages.upsert(Message::node_progress(
                event.node.clone(),
                event.run.key().to_string(),
                "done",
            ));
        }

        self.final_batch.extend(parse_final_messages(&event.payload));
    }

    /// End-of-stream reconciliation
    pub(crate) fn finalize(&mut self, state: &mut SessionState, config: &EngineConfig) {
        let artifact_content = state
            .artifact
            .as_ref()
            .and_then(Artifact::current)
            .map(|v| v.content().to_string());

        let batch = std::mem::take(&mut self.final_batch);
        let optimistic = std::mem::take(&mut state.optimistic_human_ids);
        state.messages.reconcile_final(
            batch,
            artifact_content.as_deref(),
            &optimistic,
            config.artifact_echo_prefix_len,
        );

        state.needs_summarization =
            state.messages.total_chars() > config.transcript_char_ceiling;
    }
}

/// Final transcript messages carried by an end-of-node frame
///
/// Shape: `{"messages": [{"id", "type": "human"|"ai", "content"}]}`.
/// Anything unrecognized is ignored.
fn parse_final_messages(payload: &Value) -> Vec<Message> {
    let Some(items) = payload.get("messages").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let role = item.get("type").and_then(Value::as_str)?;
            let id = item.get("id").and_then(Value::as_str).unwrap_or_default();
            let content = extract_text(item.get("content")?);
            match role {
                "human" | "user" => {
                    Some(Message::with_id(id, MessageBody::Human { content }))
                }
                "ai" | "assistant" => Some(Message::with_id(
                    id,
                    MessageBody::Assistant {
                        content,
                        streaming: false,
                    },
                )),
                _ => None,
            }
        })
        .collect()
}
