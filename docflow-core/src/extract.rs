//! Structured extraction of a stripped answer. Never fails outward: any
//! text that does not parse as a JSON object becomes `{"text": <text>}`.

use serde_json::Value;

use crate::model::StructuredResult;

pub fn extract_result(stripped: &str) -> StructuredResult {
    match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            // Valid JSON but not a mapping (array, number, string...).
            // Callers expect a mapping; wrap it like unparsable text.
            tracing::warn!(kind = %json_kind(&other), "answer parsed as non-object JSON, wrapping");
            fallback(stripped)
        }
        Err(_) => fallback(stripped),
    }
}

fn fallback(text: &str) -> StructuredResult {
    let mut map = StructuredResult::new();
    map.insert("text".to_string(), Value::String(text.to_string()));
    map
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
