use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreResult, DocflowError};

/// Structured outcome of one invocation. Either the parsed JSON answer or
/// the `{"text": ...}` fallback built by `extract` — never raw text, never
/// absent.
pub type StructuredResult = serde_json::Map<String, Value>;

/// Inputs forwarded to the chatflow app alongside the question. These
/// drive the upstream document-drafting workflow and are passed through
/// untouched under the payload's `inputs` key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DocumentInputs {
    pub docx_create: bool,
    pub style: String,
    pub file_num: u32,
    pub menu: String,
    pub outline: String,
    pub example: String,
    pub relevant_documents: Vec<Value>,
}

impl Default for DocumentInputs {
    fn default() -> Self {
        Self {
            docx_create: false,
            style: "不指定".to_string(),
            file_num: 1000,
            menu: String::new(),
            outline: String::new(),
            example: String::new(),
            relevant_documents: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AskRequest {
    pub question: String,
    /// Caller identity forwarded to the upstream app.
    pub user: String,
    /// Continuity token for multi-turn conversations. Empty string means
    /// "start a new conversation". Only meaningful for chatflow apps.
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub inputs: DocumentInputs,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            user: user.into(),
            conversation_id: String::new(),
            inputs: DocumentInputs::default(),
        }
    }

    /// Rejects requests before any upstream call is made.
    pub fn validate(&self) -> CoreResult<()> {
        if self.question.trim().is_empty() {
            return Err(DocflowError::Validation("question must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(DocflowError::Validation("user must not be empty".into()));
        }
        Ok(())
    }
}

/// Built exactly once per invocation, after the upstream stream reached a
/// terminal condition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FinalPayload {
    pub result: StructuredResult,
    /// Latest conversation id seen upstream, or the caller-supplied one
    /// (possibly empty) when no update arrived.
    pub conversation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_roundtrip() {
        let mut req = AskRequest::new("写一份报告", "user-1");
        req.conversation_id = "c-123".into();
        req.inputs.docx_create = true;
        req.inputs.file_num = 2000;

        let json = serde_json::to_string(&req).unwrap();
        let de: AskRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, de);
    }

    #[test]
    fn missing_optional_fields_default() {
        let de: AskRequest =
            serde_json::from_str(r#"{"question":"q","user":"u"}"#).unwrap();
        assert_eq!(de.conversation_id, "");
        assert_eq!(de.inputs.style, "不指定");
        assert_eq!(de.inputs.file_num, 1000);
        assert!(de.inputs.relevant_documents.is_empty());
    }

    #[test]
    fn validate_rejects_blank_question() {
        let req = AskRequest::new("   ", "u");
        let err = req.validate().unwrap_err();
        assert!(matches!(err, DocflowError::Validation(_)));
    }

    #[test]
    fn validate_rejects_blank_user() {
        let req = AskRequest::new("q", "");
        assert!(req.validate().is_err());
    }

    #[test]
    fn final_payload_roundtrip() {
        let mut result = StructuredResult::new();
        result.insert("title".into(), serde_json::json!("T"));
        let payload = FinalPayload {
            result,
            conversation_id: "c-1".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let de: FinalPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, de);
    }
}
