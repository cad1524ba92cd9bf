//! Static route table for the context adapter.
//!
//! Each `(method, pattern)` pair maps to exactly one [`Operation`]. Patterns
//! are `/`-separated and may contain a single `{id}` segment.

use rule_core::{Error, Result};
use serde_json::{json, Value};

/// Client operation a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListSubscribers,
    GetSubscriber,
    CreateSubscriber,
    UpdateSubscriber,
    DeleteSubscriber,
    ListTags,
    CreateTag,
    ListCampaigns,
    ListCustomFields,
    CreateCustomField,
}

impl Operation {
    /// MCP tool name for this operation.
    pub fn tool_name(self) -> &'static str {
        match self {
            Operation::ListSubscribers => "list_subscribers",
            Operation::GetSubscriber => "get_subscriber",
            Operation::CreateSubscriber => "create_subscriber",
            Operation::UpdateSubscriber => "update_subscriber",
            Operation::DeleteSubscriber => "delete_subscriber",
            Operation::ListTags => "list_tags",
            Operation::CreateTag => "create_tag",
            Operation::ListCampaigns => "list_campaigns",
            Operation::ListCustomFields => "list_custom_fields",
            Operation::CreateCustomField => "create_custom_field",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Operation::ListSubscribers => "List Rule.io subscribers with paging and filters",
            Operation::GetSubscriber => "Get a single Rule.io subscriber by id or email",
            Operation::CreateSubscriber => "Create a Rule.io subscriber",
            Operation::UpdateSubscriber => "Update email, tags or fields of a subscriber",
            Operation::DeleteSubscriber => "Delete a Rule.io subscriber",
            Operation::ListTags => "List tags",
            Operation::CreateTag => "Create a tag",
            Operation::ListCampaigns => "List campaigns",
            Operation::ListCustomFields => "List custom field definitions",
            Operation::CreateCustomField => "Create a custom field definition",
        }
    }

    /// Key wrapping the records in a list response, `None` for single-record routes.
    pub fn resource_key(self) -> Option<&'static str> {
        match self {
            Operation::ListSubscribers => Some("subscribers"),
            Operation::ListTags => Some("tags"),
            Operation::ListCampaigns => Some("campaigns"),
            Operation::ListCustomFields => Some("fields"),
            _ => None,
        }
    }

    /// JSON schema of the MCP tool arguments.
    pub fn input_schema(self) -> Value {
        let paging = json!({
            "page": {
                "type": "integer",
                "description": "Page number (default: 1)",
                "minimum": 1
            },
            "limit": {
                "type": "integer",
                "description": "Page size (default: 100)",
                "minimum": 1
            }
        });
        let id = json!({
            "type": "string",
            "description": "Subscriber id or email address"
        });
        let tags = json!({
            "type": "array",
            "items": { "type": "string" },
            "description": "Tag names"
        });
        let fields = json!({
            "type": "object",
            "description": "Custom field values keyed by field name"
        });

        let (mut properties, required) = match self {
            Operation::ListSubscribers => {
                let mut props = paging;
                props["filters"] = json!({
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Extra filters passed to the API (e.g. tag, status)"
                });
                (props, vec![])
            }
            Operation::ListTags | Operation::ListCampaigns | Operation::ListCustomFields => {
                (paging, vec![])
            }
            Operation::GetSubscriber | Operation::DeleteSubscriber => {
                (json!({ "id": id }), vec!["id"])
            }
            Operation::CreateSubscriber => (
                json!({
                    "email": { "type": "string", "description": "Subscriber email" },
                    "tags": tags,
                    "fields": fields
                }),
                vec!["email"],
            ),
            Operation::UpdateSubscriber => (
                json!({
                    "id": id,
                    "email": { "type": "string", "description": "New email" },
                    "tags": tags,
                    "fields": fields
                }),
                vec!["id"],
            ),
            Operation::CreateTag => (
                json!({ "name": { "type": "string", "description": "Tag name" } }),
                vec!["name"],
            ),
            Operation::CreateCustomField => (
                json!({
                    "name": { "type": "string", "description": "Field name" },
                    "type": {
                        "type": "string",
                        "description": "Field type (e.g. text, number, date)"
                    },
                    "default_value": { "description": "Default value for the field" }
                }),
                vec!["name", "type"],
            ),
        };

        properties["api_key"] = json!({
            "type": "string",
            "description": "Rule.io API key (overrides the server default)"
        });

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

/// A single route table entry.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub method: &'static str,
    pub pattern: &'static str,
    pub operation: Operation,
}

pub const ROUTES: &[Route] = &[
    Route { method: "GET", pattern: "/subscribers", operation: Operation::ListSubscribers },
    Route { method: "POST", pattern: "/subscribers", operation: Operation::CreateSubscriber },
    Route { method: "GET", pattern: "/subscribers/{id}", operation: Operation::GetSubscriber },
    Route { method: "PUT", pattern: "/subscribers/{id}", operation: Operation::UpdateSubscriber },
    Route { method: "DELETE", pattern: "/subscribers/{id}", operation: Operation::DeleteSubscriber },
    Route { method: "GET", pattern: "/tags", operation: Operation::ListTags },
    Route { method: "POST", pattern: "/tags", operation: Operation::CreateTag },
    Route { method: "GET", pattern: "/campaigns", operation: Operation::ListCampaigns },
    Route { method: "GET", pattern: "/fields", operation: Operation::ListCustomFields },
    Route { method: "POST", pattern: "/fields", operation: Operation::CreateCustomField },
];

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub operation: Operation,
    pub id: Option<String>,
}

/// Find the route for a method and path.
///
/// The query string and trailing slashes are ignored, the method is matched
/// case-insensitively. Anything unmatched is `Error::UnsupportedOperation`.
pub fn resolve(method: &str, path: &str) -> Result<RouteMatch> {
    let path = path.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    ROUTES
        .iter()
        .filter(|route| route.method.eq_ignore_ascii_case(method.trim()))
        .find_map(|route| {
            match_pattern(route.pattern, &segments).map(|id| RouteMatch {
                operation: route.operation,
                id,
            })
        })
        .ok_or_else(|| Error::UnsupportedOperation {
            method: method.to_string(),
            path: path.to_string(),
        })
}

/// Route for an operation (inverse of [`resolve`]).
pub fn route_for(operation: Operation) -> &'static Route {
    ROUTES
        .iter()
        .find(|route| route.operation == operation)
        .unwrap_or(&ROUTES[0])
}

/// Match path segments against a pattern, returning the captured id (if any).
/// The id is percent-decoded.
fn match_pattern(pattern: &str, segments: &[&str]) -> Option<Option<String>> {
    let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != segments.len() {
        return None;
    }

    let mut id = None;
    for (part, segment) in parts.iter().zip(segments) {
        if *part == "{id}" {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            id = Some(decoded);
        } else if part != segment {
            return None;
        }
    }
    Some(id)
}
