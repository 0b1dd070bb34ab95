//! The response-normalization pipeline.
//!
//! Pulls raw SSE lines from one upstream connection, classifies them, and
//! multiplexes the result onto one outbound channel: live text chunks in
//! arrival order, then exactly one terminal unit (`Final` or `Error`).
//!
//! One `NormalizedStream` owns one `StreamState` and one upstream
//! connection; concurrent invocations are fully independent. Dropping the
//! stream releases the connection and emits nothing further.

use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;

use crate::event::{self, EventKind, EventRecord};
use crate::extract::extract_result;
use crate::http_client::SseStream;
use crate::model::FinalPayload;
use crate::sanitize::strip_answer;
use crate::stream::OutboundUnit;

/// Mutable state threaded through one invocation. Destroyed once the
/// terminal unit has been emitted.
#[derive(Debug)]
pub struct StreamState {
    pub full_text: String,
    pub conversation_id: String,
}

impl StreamState {
    pub fn new(conversation_id: String) -> Self {
        Self {
            full_text: String::new(),
            conversation_id,
        }
    }

    /// Track the latest non-empty conversation id seen in any record.
    /// An absent or empty id never reverts a previously-seen value.
    pub fn observe(&mut self, rec: &EventRecord) {
        if let Some(id) = &rec.conversation_id {
            self.conversation_id = id.clone();
        }
    }

    pub fn push_text(&mut self, fragment: &str) {
        self.full_text.push_str(fragment);
    }

    /// Strip and extract the accumulated text into the one `FinalPayload`
    /// of this invocation. Consumes the state; termination is modeled by
    /// the state no longer existing.
    pub fn finalize(self) -> FinalPayload {
        let stripped = strip_answer(&self.full_text);
        FinalPayload {
            result: extract_result(&stripped),
            conversation_id: self.conversation_id,
        }
    }
}

/// Post-process a blocking-mode answer the same way the streaming path
/// does after termination.
pub fn finalize_answer(answer: &str, conversation_id: String) -> FinalPayload {
    let mut state = StreamState::new(conversation_id);
    state.push_text(answer);
    state.finalize()
}

/// Pull-driven adapter from an upstream SSE line stream to outbound units.
///
/// State machine: `OPEN → (chunk)* → {FINISHED → EMIT_FINAL}
/// | {ERROR_EVENT → EMIT_ERROR} | {TRANSPORT_FAILURE → EMIT_ERROR}`.
/// End of input without an explicit finish event finalizes normally.
pub struct NormalizedStream {
    lines: Option<SseStream>,
    state: Option<StreamState>,
}

impl NormalizedStream {
    pub fn new(lines: SseStream, conversation_id: String) -> Self {
        Self {
            lines: Some(lines),
            state: Some(StreamState::new(conversation_id)),
        }
    }

    fn emit_final(&mut self) -> OutboundUnit {
        self.lines = None; // release the upstream connection
        match self.state.take() {
            Some(state) => OutboundUnit::Final(state.finalize()),
            // Unreachable: state is only taken together with lines.
            None => OutboundUnit::Error(Value::String("stream already terminated".into())),
        }
    }

    fn emit_error(&mut self, detail: Value) -> OutboundUnit {
        self.lines = None;
        self.state = None;
        OutboundUnit::Error(detail)
    }
}

impl futures_util::stream::Stream for NormalizedStream {
    type Item = OutboundUnit;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let Some(lines) = self.lines.as_mut() else {
                return Poll::Ready(None);
            };
            match lines.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(sse))) => {
                    let Some(value) = event::decode_data_line(&sse.line) else {
                        continue; // tolerated transport noise
                    };
                    let rec = event::classify(&value);
                    if let Some(state) = self.state.as_mut() {
                        state.observe(&rec);
                    }
                    match rec.kind {
                        EventKind::TextChunk(text) | EventKind::Message(text) => {
                            if let Some(state) = self.state.as_mut() {
                                state.push_text(&text);
                            }
                            return Poll::Ready(Some(OutboundUnit::Chunk(text)));
                        }
                        EventKind::Finished => {
                            return Poll::Ready(Some(self.emit_final()));
                        }
                        EventKind::Error(detail) => {
                            tracing::warn!("upstream reported an error event");
                            return Poll::Ready(Some(self.emit_error(detail)));
                        }
                        EventKind::Unrecognized => continue,
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(error = %e, "transport failure mid-stream");
                    let detail = Value::String(e.to_string());
                    return Poll::Ready(Some(self.emit_error(detail)));
                }
                Poll::Ready(None) => {
                    return Poll::Ready(Some(self.emit_final()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
