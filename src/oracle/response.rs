use serde_json::{Value, json};

use crate::verdict::Verdict;

/// What came back from the oracle. The wire contract promises free-form text
/// that is *expected* to contain a JSON object; both shapes are first-class
/// and callers must handle each explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleResponse {
    Json(Value),
    Text(String),
}

impl OracleResponse {
    /// Carves a JSON object out of the raw reply: everything from the first
    /// `{` to the last `}`. Anything that fails to parse stays as `Text`.
    pub fn parse(raw: &str) -> Self {
        if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
            if end > start {
                if let Ok(value) = serde_json::from_str::<Value>(&raw[start..=end]) {
                    return OracleResponse::Json(value);
                }
            }
        }
        OracleResponse::Text(raw.to_string())
    }

    pub fn status(&self) -> Option<Verdict> {
        match self {
            OracleResponse::Json(value) => value
                .get("status")
                .and_then(Value::as_str)
                .and_then(Verdict::from_str),
            OracleResponse::Text(_) => None,
        }
    }

    pub fn detected_language(&self) -> Option<&str> {
        match self {
            OracleResponse::Json(value) => value.get("detected_language").and_then(Value::as_str),
            OracleResponse::Text(_) => None,
        }
    }

    /// Value for aggregation into the combined evidence set. Unparsed text is
    /// wrapped rather than dropped so the decision layer still sees it.
    pub fn to_value(&self) -> Value {
        match self {
            OracleResponse::Json(value) => value.clone(),
            OracleResponse::Text(text) => json!({ "raw_response": text }),
        }
    }
}
