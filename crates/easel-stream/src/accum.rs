//! Partial-content accumulator
//!
//! Token payloads arrive in whatever shape the upstream provider favors:
//! a bare string, a list of typed content blocks, or an object with nested
//! content. Everything reduces to a single string here, and per-node
//! buffers grow it into the full content snapshot the version model needs.
//!
//! Scoped patches splice into a highlighted span: the prefix and suffix
//! around the span are captured once, at the first token, and every
//! subsequent snapshot is `prefix + accumulated + suffix`.

use crate::partial_json::repair;
use serde_json::Value;
use std::collections::HashMap;

/// Highlighted span in char offsets, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    /// First highlighted char
    pub start: usize,
    /// One past the last highlighted char
    pub end: usize,
}

/// Reduce a token payload to its text content
///
/// Tolerated shapes, in order of preference:
/// - a plain string
/// - a list of content blocks (`{type: "text", text}` or bare strings)
/// - an object with `content`, `delta` or `text`
///
/// Anything else reduces to the empty string, which callers drop.
#[must_use]
pub fn extract_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .map(|block| match block {
                Value::String(s) => s.clone(),
                Value::Object(obj) => {
                    let kind = obj.get("type").and_then(Value::as_str);
                    if matches!(kind, Some("thinking") | Some("input_json_delta")) {
                        String::new()
                    } else {
                        obj.get("text")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    }
                }
                _ => String::new(),
            })
            .collect(),
        Value::Object(obj) => {
            if let Some(content) = obj.get("content") {
                extract_text(content)
            } else if let Some(delta) = obj.get("delta") {
                extract_text(delta)
            } else {
                obj.get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            }
        }
        _ => String::new(),
    }
}

/// Pull a reasoning trace out of a token payload, if it carries one
#[must_use]
pub fn extract_thinking(payload: &Value) -> Option<String> {
    match payload {
        Value::Array(blocks) => {
            let text: String = blocks
                .iter()
                .filter_map(|b| {
                    let obj = b.as_object()?;
                    (obj.get("type").and_then(Value::as_str) == Some("thinking"))
                        .then(|| obj.get("thinking").and_then(Value::as_str))?
                        .map(str::to_string)
                })
                .collect();
            (!text.is_empty()).then_some(text)
        }
        Value::Object(obj) => {
            if let Some(content) = obj.get("content") {
                return extract_thinking(content);
            }
            obj.get("thinking")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        _ => None,
    }
}

/// Pull a structured tool-argument fragment out of a token payload
#[must_use]
pub fn extract_json_delta(payload: &Value) -> Option<String> {
    match payload {
        Value::Array(blocks) => {
            let text: String = blocks
                .iter()
                .filter_map(|b| {
                    let obj = b.as_object()?;
                    (obj.get("type").and_then(Value::as_str) == Some("input_json_delta"))
                        .then(|| obj.get("partial_json").and_then(Value::as_str))?
                        .map(str::to_string)
                })
                .collect();
            (!text.is_empty()).then_some(text)
        }
        Value::Object(obj) => {
            if let Some(content) = obj.get("content") {
                return extract_json_delta(content);
            }
            obj.get("partial_json")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        _ => None,
    }
}

/// Immutable splice context for a scoped patch
#[derive(Debug, Clone)]
struct Splice {
    prefix: String,
    suffix: String,
}

#[derive(Debug, Default)]
struct NodeBuffer {
    text: String,
    json_raw: String,
    splice: Option<Splice>,
}

impl NodeBuffer {
    fn snapshot(&self, inner: &str) -> String {
        match &self.splice {
            Some(s) => format!("{}{}{}", s.prefix, inner, s.suffix),
            None => inner.to_string(),
        }
    }
}

/// Per-operation-node content accumulator
#[derive(Debug, Default)]
pub struct Accumulator {
    buffers: HashMap<String, NodeBuffer>,
}

impl Accumulator {
    /// Create an empty accumulator for a fresh stream
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the splice context around a highlighted span
    ///
    /// Offsets are char offsets into `source`; out-of-range values clamp.
    /// Only the first capture for a node sticks.
    pub fn capture_splice(&mut self, node: &str, source: &str, span: HighlightSpan) {
        let buffer = self.buffers.entry(node.to_string()).or_default();
        if buffer.splice.is_some() {
            return;
        }
        let total = source.chars().count();
        let start = span.start.min(total);
        let end = span.end.clamp(start, total);
        let prefix: String = source.chars().take(start).collect();
        let suffix: String = source.chars().skip(end).collect();
        buffer.splice = Some(Splice { prefix, suffix });
    }

    /// Append a text fragment and return the reconstructed full content
    ///
    /// Empty fragments are dropped: no mutation, `None` back.
    pub fn push_text(&mut self, node: &str, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }
        let buffer = self.buffers.entry(node.to_string()).or_default();
        buffer.text.push_str(fragment);
        let inner = buffer.text.clone();
        Some(buffer.snapshot(&inner))
    }

    /// Append a structured JSON fragment and return the extracted content
    ///
    /// The raw fragment accumulates; each step best-effort parses the whole
    /// buffer and pulls the content field out. An unparseable prefix is not
    /// an error, just `None` (no downstream mutation yet).
    pub fn push_json(&mut self, node: &str, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }
        let buffer = self.buffers.entry(node.to_string()).or_default();
        buffer.json_raw.push_str(fragment);
        let value = repair(&buffer.json_raw)?;
        let inner = content_field(&value)?;
        if inner.is_empty() {
            return None;
        }
        Some(buffer.snapshot(&inner))
    }

    /// Current reconstructed content for a node, if any accumulated
    #[must_use]
    pub fn content(&self, node: &str) -> Option<String> {
        let buffer = self.buffers.get(node)?;
        if !buffer.text.is_empty() {
            return Some(buffer.snapshot(&buffer.text));
        }
        let value = repair(&buffer.json_raw)?;
        let inner = content_field(&value)?;
        (!inner.is_empty()).then(|| buffer.snapshot(&inner))
    }

    /// Title announced by a structured payload, if one parsed yet
    #[must_use]
    pub fn title(&self, node: &str) -> Option<String> {
        let buffer = self.buffers.get(node)?;
        let value = repair(&buffer.json_raw)?;
        value
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

fn content_field(value: &Value) -> Option<String> {
    for key in ["artifact", "content", "code", "fullMarkdown", "text"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}
