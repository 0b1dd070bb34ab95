//! Stateless workflow app. One question in, one answer out; streaming
//! answers arrive as `text_chunk` events and there is no conversation id.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    error::CoreResult,
    http_client::HttpClient,
    model::{AskRequest, FinalPayload},
    normalize::normalize_ask,
    pipeline::{NormalizedStream, finalize_answer},
    provider::ConversationProvider,
    stream::OutboundStream,
};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DifyWorkflow {
    http: HttpClient,
    api_key: SecretString,
    base: String,
    name: String,
}

impl DifyWorkflow {
    pub fn new(http: HttpClient, api_key: SecretString, base: String) -> Self {
        Self {
            http,
            api_key,
            base,
            name: "workflow".into(),
        }
    }

    #[cfg(test)]
    pub fn new_for_tests(server_base: &str) -> Self {
        DifyWorkflow::new(
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
        format!("{}/v1/workflows/run", self.base)
    }
}

// ===== Workflow wire types =====

#[derive(Serialize)]
struct WfReq<'a> {
    inputs: WfInputs<'a>,
    response_mode: &'a str,
    user: &'a str,
}

#[derive(Serialize)]
struct WfInputs<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct WfBlockingResp {
    data: WfData,
}

#[derive(Deserialize)]
struct WfData {
    outputs: WfOutputs,
}

#[derive(Deserialize)]
struct WfOutputs {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ConversationProvider for DifyWorkflow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ask(&self, req: AskRequest) -> CoreResult<FinalPayload> {
        let req = normalize_ask(req);
        req.validate()?;
        let payload = WfReq {
            inputs: WfInputs {
                question: &req.question,
            },
            response_mode: "blocking",
            user: &req.user,
        };
        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let resp: WfBlockingResp = self
            .http
            .post_json(&self.name, &self.url(), &payload, &hdrs)
            .await?;
        Ok(finalize_answer(&resp.data.outputs.text, String::new()))
    }

    async fn ask_stream(&self, req: AskRequest) -> CoreResult<OutboundStream> {
        let req = normalize_ask(req);
        req.validate()?;
        tracing::info!(app = %self.name, user = %req.user, "starting streamed workflow run");
        let payload = WfReq {
            inputs: WfInputs {
                question: &req.question,
            },
            response_mode: "streaming",
            user: &req.user,
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
        Ok(Box::pin(NormalizedStream::new(lines, String::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocflowError;
    use crate::stream::{OutboundUnit, RESULT_SENTINEL};
    use futures_util::StreamExt;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn blocking_ask_extracts_fenced_answer() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/workflows/run")
                .header("authorization", "Bearer test-key")
                .body_contains("\"response_mode\":\"blocking\"");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": { "outputs": {
                        "text": "<think>r</think>```json\n{\"title\":\"T\"}\n```"
                    }}
                }));
        });

        let provider = DifyWorkflow::new_for_tests(&server.base_url());
        let payload = provider.ask(AskRequest::new("写一份报告", "u1")).await.unwrap();
        assert_eq!(payload.result["title"], json!("T"));
        assert_eq!(payload.conversation_id, "");
        m.assert();
    }

    #[tokio::test]
    async fn streamed_ask_yields_chunks_then_final() {
        let server = MockServer::start();
        let body = concat!(
            "data: {\"event\":\"text_chunk\",\"data\":{\"text\":\"Hel\"}}\n",
            "\n",
            "data: {\"event\":\"text_chunk\",\"data\":{\"text\":\"lo\"}}\n",
            "data: {\"event\":\"workflow_finished\"}\n",
        );
        let _m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/workflows/run")
                .body_contains("\"response_mode\":\"streaming\"");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        });

        let provider = DifyWorkflow::new_for_tests(&server.base_url());
        let units: Vec<OutboundUnit> = provider
            .ask_stream(AskRequest::new("q", "u"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(units[0], OutboundUnit::Chunk("Hel".into()));
        assert_eq!(units[1], OutboundUnit::Chunk("lo".into()));
        match units.last().unwrap() {
            OutboundUnit::Final(payload) => {
                assert_eq!(payload.result["text"], json!("Hello"));
            }
            other => panic!("expected final unit, got {other:?}"),
        }
        assert!(units.last().unwrap().encode().starts_with(RESULT_SENTINEL));
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_any_call() {
        // Unroutable base: a request would fail loudly, so a Validation
        // error proves the short-circuit.
        let provider = DifyWorkflow::new_for_tests("http://127.0.0.1:9");
        let err = provider.ask(AskRequest::new("   ", "u")).await.unwrap_err();
        assert!(matches!(err, DocflowError::Validation(_)));
        let err = provider
            .ask_stream(AskRequest::new("", "u"))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, DocflowError::Validation(_)));
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/workflows/run");
            then.status(429).body("limit");
        });
        let provider = DifyWorkflow::new_for_tests(&server.base_url());
        let err = provider.ask(AskRequest::new("q", "u")).await.unwrap_err();
        match err {
            DocflowError::RateLimited { app, .. } => assert_eq!(app, "workflow"),
            other => panic!("expected RateLimited, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn blocking_missing_text_defaults_to_empty_fallback() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/workflows/run");
            then.status(200).json_body(json!({"data":{"outputs":{}}}));
        });
        let provider = DifyWorkflow::new_for_tests(&server.base_url());
        let payload = provider.ask(AskRequest::new("q", "u")).await.unwrap();
        assert_eq!(payload.result["text"], json!(""));
    }
}
