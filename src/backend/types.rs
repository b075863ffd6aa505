//! Wire types of the backend HTTP API

use crate::conversation::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Target model id
    pub model: String,
    /// Full conversation history, oldest first
    pub messages: Vec<Message>,
    /// Always true for this client
    pub stream: bool,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Cap on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Builds a streaming request
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::backend::ChatRequest;
    /// use chatline::conversation::Message;
    ///
    /// let req = ChatRequest::streaming("tinyllama", vec![Message::user("Hi")]);
    /// let json = serde_json::to_value(&req).unwrap();
    /// assert_eq!(json["stream"], true);
    /// assert!(json.get("maxTokens").is_none());
    /// ```
    pub fn streaming(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets optional sampling parameters
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// Size class reported by the model catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    /// Small model
    Small,
    /// Medium model
    Medium,
    /// Large model
    Large,
    /// Any category this client does not know
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelCategory::Small => "small",
            ModelCategory::Medium => "medium",
            ModelCategory::Large => "large",
            ModelCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One entry of `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model id used in chat requests
    pub id: String,
    /// Display name
    pub name: String,
    /// Size class
    pub category: ModelCategory,
    /// Weights file name on the backend host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Size in megabytes
    #[serde(default)]
    pub size_mb: f64,
    /// Weights path on the backend host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether the model is resident in memory
    #[serde(default)]
    pub loaded: bool,
}

/// Response of `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Available models
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// Error envelope returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error body
    pub error: ErrorBody,
}

/// Inner error of [`ErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `NOT_IMPLEMENTED`
    #[serde(default)]
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Extra structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.code, self.message),
            (true, false) => f.write_str(&self.message),
            (false, true) => f.write_str(&self.code),
            (true, true) => f.write_str("unspecified backend error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_serializes_camel_case_sampling() {
        let req = ChatRequest::streaming("tinyllama", vec![Message::user("Hi")])
            .with_sampling(Some(0.5), Some(256));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "tinyllama");
        assert_eq!(value["stream"], true);
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["maxTokens"], 256);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "Hi");
    }

    #[test]
    fn test_models_response_parses_catalog_entries() {
        let body = json!({
            "models": [
                {"id": "tinyllama", "name": "TinyLlama 1.1B", "category": "small",
                 "filename": "tinyllama.gguf", "size": 668788096, "size_mb": 637.8,
                 "path": "/models/tinyllama.gguf", "loaded": true},
                {"id": "odd", "name": "Odd", "category": "huge", "size_mb": 1}
            ]
        });
        let parsed: ModelsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.models.len(), 2);
        assert_eq!(parsed.models[0].category, ModelCategory::Small);
        assert!(parsed.models[0].loaded);
        assert_eq!(parsed.models[1].category, ModelCategory::Unknown);
        assert!(!parsed.models[1].loaded);
        assert!(parsed.models[1].filename.is_none());
    }

    #[test]
    fn test_error_body_display() {
        let body: ErrorResponse = serde_json::from_value(json!({
            "error": {"code": "NOT_IMPLEMENTED", "message": "Chat endpoint not yet implemented"}
        }))
        .unwrap();
        assert_eq!(
            body.error.to_string(),
            "NOT_IMPLEMENTED: Chat endpoint not yet implemented"
        );
    }
}
