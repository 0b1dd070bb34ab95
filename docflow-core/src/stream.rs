//! Outbound units emitted by the normalization pipeline.
//!
//! Contract:
//! - 0..n `Chunk` units in upstream arrival order.
//! - Exactly one terminal unit: `Final` (sentinel-prefixed JSON payload)
//!   or `Error` (bare `{"error": ...}` JSON). Never both.
//! - After a terminal unit, no further units are emitted.

use serde_json::Value;

use crate::model::FinalPayload;

/// Sentinel prefix marking the one structured result on the shared
/// text channel. Everything before it is raw display text.
pub const RESULT_SENTINEL: &str = "__RESULT__";

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundUnit {
    /// Raw text fragment for live display, no framing.
    Chunk(String),
    /// The one structured result of the invocation.
    Final(FinalPayload),
    /// Terminal failure descriptor (upstream error event or transport
    /// failure), surfaced verbatim.
    Error(Value),
}

impl OutboundUnit {
    /// Returns true if this unit terminates the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::Error(_))
    }

    /// Convenience accessor for `Chunk` contents.
    pub fn as_chunk(&self) -> Option<&str> {
        match self {
            Self::Chunk(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Encode this unit as one line of the wire protocol. `serde_json`
    /// leaves non-ASCII characters unescaped, so CJK answers stay
    /// readable on the wire.
    pub fn encode(&self) -> String {
        match self {
            Self::Chunk(s) => s.clone(),
            Self::Final(payload) => {
                let body = serde_json::to_string(payload)
                    .unwrap_or_else(|_| r#"{"result":{},"conversation_id":""}"#.to_string());
                format!("{RESULT_SENTINEL}{body}")
            }
            Self::Error(detail) => {
                serde_json::to_string(&serde_json::json!({ "error": detail }))
                    .unwrap_or_else(|_| r#"{"error":"unencodable error"}"#.to_string())
            }
        }
    }
}

/// Boxed stream of outbound units, decoupled from any transport.
pub type OutboundStream = futures::stream::BoxStream<'static, OutboundUnit>;
