use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::{AskRequest, FinalPayload};
use crate::stream::{OutboundStream, OutboundUnit};

/// One upstream conversational app. Implementations own their transport;
/// callers pick live or blocking delivery per request.
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Blocking mode: one upstream call, the `FinalPayload` equivalent of
    /// the stream's terminal unit, no incremental emission.
    async fn ask(&self, req: AskRequest) -> CoreResult<FinalPayload>;

    /// Live mode: 0..n chunk units in arrival order, then exactly one
    /// terminal unit.
    async fn ask_stream(&self, req: AskRequest) -> CoreResult<OutboundStream>;
}

/// A dummy provider implementation that always returns canned responses.
/// Useful for tests or as a placeholder.
pub struct NullProvider;

impl NullProvider {
    fn canned(req: &AskRequest) -> FinalPayload {
        crate::pipeline::finalize_answer("[null app response]", req.conversation_id.clone())
    }
}

#[async_trait]
impl ConversationProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn ask(&self, req: AskRequest) -> CoreResult<FinalPayload> {
        req.validate()?;
        Ok(Self::canned(&req))
    }

    async fn ask_stream(&self, req: AskRequest) -> CoreResult<OutboundStream> {
        req.validate()?;
        let units = vec![
            OutboundUnit::Chunk("[null app response]".into()),
            OutboundUnit::Final(Self::canned(&req)),
        ];
        Ok(Box::pin(futures::stream::iter(units)))
    }
}
