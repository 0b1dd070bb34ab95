//! SSE line decoding and event classification.
//!
//! Contract:
//! - Lines not beginning with `data: ` are transport noise and are skipped.
//! - A `data: ` line whose remainder is not valid JSON is also skipped,
//!   silently. Keep-alives and partial fragments must not kill the stream.
//! - Every decoded object maps to exactly one `EventRecord`; downstream
//!   consumers match over the closed set of kinds instead of probing
//!   optional fields.

use serde_json::Value;

/// Recognized SSE event prefix.
pub const DATA_PREFIX: &str = "data: ";

/// Decode one raw SSE line into a JSON object, or `None` for anything
/// that should be skipped.
pub fn decode_data_line(line: &str) -> Option<Value> {
    if line.is_empty() {
        return None;
    }
    let rest = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str(rest) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparsable data line");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Incremental text from a workflow app (`data.text`).
    TextChunk(String),
    /// Incremental answer from a chatflow app (`answer`).
    Message(String),
    /// Producer has no more data; stop reading.
    Finished,
    /// Upstream-reported failure; payload is surfaced verbatim.
    Error(Value),
    /// Anything else, dropped without effect.
    Unrecognized,
}

/// One classified upstream event. Created per decoded line, discarded
/// after the pipeline consumed it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub kind: EventKind,
    /// Non-empty conversation id carried by the event, if any. Any event
    /// kind may carry one; the tracker takes the latest.
    pub conversation_id: Option<String>,
}

impl EventRecord {
    /// Incremental text carried by this record, if it is a chunk kind.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::TextChunk(s) | EventKind::Message(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Pure mapping from a decoded object to an `EventRecord`.
pub fn classify(value: &Value) -> EventRecord {
    let conversation_id = value
        .get("conversation_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let kind = match value.get("event").and_then(Value::as_str) {
        Some("text_chunk") => EventKind::TextChunk(
            value
                .pointer("/data/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some("message") => EventKind::Message(
            value
                .get("answer")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some("workflow_finished") => EventKind::Finished,
        Some("error") => EventKind::Error(value.clone()),
        _ => EventKind::Unrecognized,
    };

    EventRecord {
        kind,
        conversation_id,
    }
}
