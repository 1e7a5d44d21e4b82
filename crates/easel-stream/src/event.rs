//! Frame normalization
//!
//! The generation service emits newline-delimited JSON frames:
//! `{event, name, data, metadata?, runId?}`. Everything downstream works on
//! the normalized [`StreamEvent`]; raw payload shape is dealt with here and
//! nowhere else.

use serde_json::Value;

/// Lifecycle phase of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First frame of a node invocation
    Start,
    /// Incremental content fragment
    Token,
    /// Node invocation finished
    End,
    /// Stream-level failure reported by the service
    Error,
}

impl Phase {
    fn from_wire(event: &str) -> Option<Self> {
        match event {
            "start" | "on_chain_start" | "on_chat_model_start" => Some(Self::Start),
            "token" | "on_chat_model_stream" => Some(Self::Token),
            "end" | "on_chain_end" | "on_chat_model_end" => Some(Self::End),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One normalized stream event
///
/// Created per network frame, consumed exactly once, never persisted.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    /// Lifecycle phase
    pub phase: Phase,
    /// Declared operation node name (e.g. `generateArtifact`)
    pub node: String,
    /// Run identifier, if the service has assigned one yet
    pub run_id: Option<String>,
    /// Raw payload; shape varies by provider and phase
    pub payload: Value,
}

/// A parsed frame: either an event or the terminal sentinel
#[derive(Debug, Clone)]
pub enum Frame {
    /// Normalized event
    Event(StreamEvent),
    /// End-of-stream sentinel
    Done,
}

/// Errors raised while normalizing a single frame
///
/// A [`FrameError`] condemns one frame, not the stream: callers log and skip.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Frame was not a JSON object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Required field absent
    #[error("frame missing field `{0}`")]
    MissingField(&'static str),

    /// `event` value not recognized
    #[error("unknown event kind `{0}`")]
    UnknownEvent(String),
}

impl Frame {
    /// Normalize one raw frame
    ///
    /// Resolution order for the operation node: `metadata.operationNode`,
    /// then the frame's `name`. The run id may live at the top level
    /// (`runId`) or under `metadata`.
    ///
    /// # Errors
    /// Returns [`FrameError`] if the frame is structurally unusable. The
    /// caller is expected to log and continue with the next frame.
    pub fn parse(raw: &Value) -> Result<Self, FrameError> {
        let obj = raw.as_object().ok_or(FrameError::NotAnObject)?;

        let event = obj
            .get("event")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingField("event"))?;

        if event == "done" {
            return Ok(Self::Done);
        }

        let phase =
            Phase::from_wire(event).ok_or_else(|| FrameError::UnknownEvent(event.to_string()))?;

        let metadata = obj.get("metadata").and_then(Value::as_object);

        let node = metadata
            .and_then(|m| m.get("operationNode"))
            .and_then(Value::as_str)
            .or_else(|| obj.get("name").and_then(Value::as_str))
            .ok_or(FrameError::MissingField("name"))?
            .to_string();

        let run_id = obj
            .get("runId")
            .or_else(|| metadata.and_then(|m| m.get("runId")))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let payload = obj.get("data").cloned().unwrap_or(Value::Null);

        Ok(Self::Event(StreamEvent {
            phase,
            node,
            run_id,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_token_frame() {
        let raw = json!({"event": "token", "name": "generateArtifact", "data": "Hel"});
        let Frame::Event(ev) = Frame::parse(&raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(ev.phase, Phase::Token);
        assert_eq!(ev.node, "generateArtifact");
        assert_eq!(ev.run_id, None);
        assert_eq!(ev.payload, json!("Hel"));
    }

    #[test]
    fn metadata_node_wins_over_name() {
        let raw = json!({
            "event": "token",
            "name": "ChatModel",
            "data": "x",
            "metadata": {"operationNode": "rewriteArtifact", "runId": "r-1"}
        });
        let Frame::Event(ev) = Frame::parse(&raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(ev.node, "rewriteArtifact");
        assert_eq!(ev.run_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn done_sentinel() {
        let raw = json!({"event": "done"});
        assert!(matches!(Frame::parse(&raw).unwrap(), Frame::Done));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(
            Frame::parse(&json!("nope")),
            Err(FrameError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_unknown_event_kind() {
        let raw = json!({"event": "telemetry", "name": "n", "data": {}});
        assert!(matches!(
            Frame::parse(&raw),
            Err(FrameError::UnknownEvent(_))
        ));
    }

    #[test]
    fn empty_run_id_is_none() {
        let raw = json!({"event": "start", "name": "webSearch", "data": {}, "runId": ""});
        let Frame::Event(ev) = Frame::parse(&raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(ev.run_id, None);
    }

    #[test]
    fn langgraph_style_event_names_map_to_phases() {
        for (wire, phase) in [
            ("on_chain_start", Phase::Start),
            ("on_chat_model_stream", Phase::Token),
            ("on_chain_end", Phase::End),
        ] {
            let raw = json!({"event": wire, "name": "generateArtifact", "data": {}});
            let Frame::Event(ev) = Frame::parse(&raw).unwrap() else {
                panic!("expected event");
            };
            assert_eq!(ev.phase, phase, "wire kind {wire}");
        }
    }
}
