//! Rule.io API wire types.
//!
//! Envelopes wrap the resource types from `rule-core`; request bodies are
//! the exact JSON shapes the API expects.

use rule_core::Pagination;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Envelopes
// =============================================================================

/// Single-resource response: `{"data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEnvelope<T> {
    pub data: T,
}

/// List response: `{"data": [...], "pagination": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleListEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Error body returned by Rule.io on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RuleErrorBody {
    /// Extract the human-readable message from a raw error body.
    ///
    /// Falls back to the raw text when the body is not JSON or carries no
    /// message.
    pub fn message_from(raw: &str) -> String {
        serde_json::from_str::<RuleErrorBody>(raw)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| raw.to_string())
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Request body for POST /subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscriberRequest {
    pub email: String,
    pub tags: Vec<String>,
    pub fields: Map<String, Value>,
}

/// Request body for PUT /subscribers/{id}.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSubscriberRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
}

/// Request body for POST /tags.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// Request body for POST /fields.
#[derive(Debug, Clone, Serialize)]
pub struct CreateFieldRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}
