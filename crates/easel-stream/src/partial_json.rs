//! Best-effort parsing of partially streamed JSON
//!
//! Structured payloads (tool-call arguments, artifact envelopes) arrive as
//! JSON fragments. Parsing a prefix is expected to fail most of the time,
//! so the outcome is modeled as three-valued rather than as an error:
//! a truncated-but-valid prefix is a "keep going" signal, not a fault.

use serde_json::Value;

/// Outcome of parsing a possibly-incomplete JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Input parsed as a complete document
    Complete(Value),
    /// Input is a valid prefix of a document; more bytes are needed
    Incomplete,
    /// Input can never become valid JSON
    Invalid(String),
}

/// Parse input that may still be mid-stream
///
/// Never panics and never treats truncation as an error.
#[must_use]
pub fn parse_partial(input: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(input) {
        Ok(value) => ParseOutcome::Complete(value),
        Err(e) if e.is_eof() => ParseOutcome::Incomplete,
        Err(e) => ParseOutcome::Invalid(e.to_string()),
    }
}

/// Close an incomplete JSON prefix and parse the result
///
/// Balances open strings, objects and arrays, drops a dangling separator,
/// and retries the parse. Returns `None` when the input is not salvageable,
/// which callers treat the same as an empty chunk: no state mutation.
#[must_use]
pub fn repair(input: &str) -> Option<Value> {
    if let ParseOutcome::Complete(v) = parse_partial(input) {
        return Some(v);
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut candidate = input.to_string();
    if escaped {
        // A lone trailing backslash cannot be completed meaningfully
        candidate.pop();
    }
    if in_string {
        candidate.push('"');
    }

    // Drop a dangling separator; complete a dangling key with null
    let trimmed = candidate.trim_end();
    if trimmed.ends_with(',') {
        candidate = trimmed[..trimmed.len() - 1].to_string();
    } else if trimmed.ends_with(':') {
        candidate = format!("{trimmed}null");
    }

    while let Some(closer) = stack.pop() {
        candidate.push(closer);
    }

    serde_json::from_str(&candidate).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_document() {
        assert_eq!(
            parse_partial(r#"{"a": 1}"#),
            ParseOutcome::Complete(json!({"a": 1}))
        );
    }

    #[test]
    fn truncated_document_continues() {
        assert_eq!(parse_partial(r#"{"a": "hel"#), ParseOutcome::Incomplete);
        assert_eq!(parse_partial(r#"["#), ParseOutcome::Incomplete);
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(parse_partial("{]"), ParseOutcome::Invalid(_)));
    }

    #[test]
    fn repair_closes_open_string_and_object() {
        let v = repair(r#"{"title": "Poem", "artifact": "Roses are"#).unwrap();
        assert_eq!(v["title"], "Poem");
        assert_eq!(v["artifact"], "Roses are");
    }

    #[test]
    fn repair_drops_dangling_separator() {
        let v = repair(r#"{"a": 1,"#).unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn repair_completes_dangling_key() {
        let v = repair(r#"{"a":"#).unwrap();
        assert_eq!(v, json!({"a": null}));
    }

    #[test]
    fn repair_rejects_mismatched_brackets() {
        assert_eq!(repair("{]"), None);
    }

    #[test]
    fn repair_passes_through_complete_input() {
        assert_eq!(repair(r#"[1, 2]"#), Some(json!([1, 2])));
    }
}
