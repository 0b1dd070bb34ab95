//! Stateful chatflow app. Multi-turn conversations keyed by
//! `conversation_id`; streaming answers arrive as `message` events, and
//! document-drafting inputs ride along under the payload's `inputs` key.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    error::CoreResult,
    http_client::HttpClient,
    model::{AskRequest, DocumentInputs, FinalPayload},
    normalize::normalize_ask,
    pipeline::{NormalizedStream, finalize_answer},
    provider::ConversationProvider,
    stream::OutboundStream,
};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DifyChatflow {
    http: HttpClient,
    api_key: SecretString,
    base: String,
    name: String,
}

impl DifyChatflow {
    pub fn new(http: HttpClient, api_key: SecretString, base: String) -> Self {
        Self {
            http,
            api_key,
            base,
            name: "chatflow".into(),
        }
    }

    #[cfg(test)]
    pub fn new_for_tests(server_base: &str) -> Self {
        DifyChatflow::new(
            HttpClient::new_default().unwrap(),
            SecretString::new("test-key".into()),
            server_base.to_string(),
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    fn url(&self) -> String {
        format!("{}/v1/chat-messages", self.base)
    }
}

// ===== Chatflow wire types =====

#[derive(Serialize)]
struct CfReq<'a> {
    inputs: &'a DocumentInputs,
    query: &'a str,
    response_mode: &'a str,
    user: &'a str,
    conversation_id: &'a str,
}

#[derive(Deserialize)]
struct CfBlockingResp {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    conversation_id: String,
}

#[async_trait]
impl ConversationProvider for DifyChatflow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ask(&self, req: AskRequest) -> CoreResult<FinalPayload> {
        let req = normalize_ask(req);
        req.validate()?;
        let payload = CfReq {
            inputs: &req.inputs,
            query: &req.question,
            response_mode: "blocking",
            user: &req.user,
            conversation_id: &req.conversation_id,
        };
        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let resp: CfBlockingResp = self
            .http
            .post_json(&self.name, &self.url(), &payload, &hdrs)
            .await?;
        // An empty id from upstream never reverts the caller's token.
        let conversation_id = if resp.conversation_id.is_empty() {
            req.conversation_id
        } else {
            resp.conversation_id
        };
        Ok(finalize_answer(&resp.answer, conversation_id))
    }

    async fn ask_stream(&self, req: AskRequest) -> CoreResult<OutboundStream> {
        let req = normalize_ask(req);
        req.validate()?;
        tracing::info!(
            app = %self.name,
            user = %req.user,
            new_conversation = req.conversation_id.is_empty(),
            "starting streamed chat"
        );
        let payload = CfReq {
            inputs: &req.inputs,
            query: &req.question,
            response_mode: "streaming",
            user: &req.user,
            conversation_id: &req.conversation_id,
        };
        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let lines = self
            .http
            .post_sse_lines(&self.name, &self.url(), &payload, &hdrs)
            .await?;
        Ok(Box::pin(NormalizedStream::new(lines, req.conversation_id)))
    }
}
