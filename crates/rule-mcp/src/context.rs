//! Context request/response envelope.
//!
//! A `ContextRequest` carries an HTTP-like method, a logical path, string
//! query parameters, an optional JSON body, and metadata holding the API key.
//! A `ContextResponse` carries a status and either the JSON body (as a string)
//! or a structured error.

use std::collections::BTreeMap;

use rule_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming adapter request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    /// JSON body for writes. Accepted either as an object or as a string
    /// holding serialized JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

/// Request metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ContextRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.metadata.api_key = Some(api_key.into());
        self
    }

    /// The API key, if present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.metadata
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Adapter response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResponse {
    pub status: u16,
    pub body: ResponseBody,
}

/// Response payload: serialized JSON on success, structured error on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(String),
    Error(ErrorBody),
}

/// Error payload with a stable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
}

impl ContextResponse {
    /// 200 response with the value serialized as the body.
    pub fn success(value: &Value) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(value.to_string()),
        }
    }

    pub fn from_error(error: &Error) -> Self {
        Self {
            status: error.status(),
            body: ResponseBody::Error(ErrorBody {
                error_code: error.code().to_string(),
                message: error.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Json(_))
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match &self.body {
            ResponseBody::Error(e) => Some(e),
            ResponseBody::Json(_) => None,
        }
    }

    /// Body as a JSON value (the error object for failures).
    pub fn json(&self) -> serde_json::Result<Value> {
        match &self.body {
            ResponseBody::Json(s) => serde_json::from_str(s),
            ResponseBody::Error(e) => serde_json::to_value(e),
        }
    }

    /// Body as text: the JSON string, or the serialized error object.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Json(s) => s.clone(),
            ResponseBody::Error(e) => serde_json::to_string(e).unwrap_or_else(|_| e.message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserialize_minimal() {
        let req: ContextRequest =
            serde_json::from_value(json!({"method": "GET", "path": "/tags"})).unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.query_params.is_empty());
        assert!(req.api_key().is_none());
    }

    #[test]
    fn test_request_full_shape() {
        let req: ContextRequest = serde_json::from_value(json!({
            "method": "GET",
            "path": "/subscribers",
            "query_params": {"limit": "10"},
            "metadata": {"api_key": "k"}
        }))
        .unwrap();
        assert_eq!(req.query_params.get("limit").map(String::as_str), Some("10"));
        assert_eq!(req.api_key(), Some("k"));
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let req = ContextRequest::new("GET", "/tags").with_api_key("   ");
        assert!(req.api_key().is_none());
    }

    #[test]
    fn test_success_response_serialization() {
        let resp = ContextResponse::success(&json!({"success": true}));
        assert!(resp.is_success());
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"status": 200, "body": "{\"success\":true}"})
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let resp = ContextResponse::from_error(&Error::NotFound("Subscriber 9".into()));
        assert_eq!(resp.status, 404);
        assert!(!resp.is_success());

        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["body"]["error_code"], "NotFoundError");
        assert_eq!(value["body"]["message"], "Not found: Subscriber 9");

        let back: ContextResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn test_text_for_error() {
        let resp = ContextResponse::from_error(&Error::Validation("email is required".into()));
        let text = resp.text();
        assert!(text.contains("\"error_code\":\"ValidationError\""));
    }
}
