//! MCP tool definitions derived from the route table.

use rule_core::{Error, Result};
use serde_json::{Map, Value};

use crate::context::ContextRequest;
use crate::protocol::ToolDefinition;
use crate::router::{self, Operation, ROUTES};

/// One tool per route.
pub fn available_tools() -> Vec<ToolDefinition> {
    ROUTES
        .iter()
        .map(|route| ToolDefinition {
            name: route.operation.tool_name().to_string(),
            description: route.operation.description().to_string(),
            input_schema: route.operation.input_schema(),
        })
        .collect()
}

/// Look up the operation behind a tool name.
pub fn operation_for(name: &str) -> Option<Operation> {
    ROUTES
        .iter()
        .map(|route| route.operation)
        .find(|op| op.tool_name() == name)
}

/// Build the context request for a tool call.
///
/// `id` fills the path segment, percent-encoded. An `api_key` argument overrides
/// `default_api_key`. Other arguments become query params for GET/DELETE
/// and the JSON body for POST/PUT.
pub fn build_request(
    name: &str,
    arguments: Option<Value>,
    default_api_key: Option<&str>,
) -> Result<ContextRequest> {
    let operation = operation_for(name).ok_or_else(|| Error::UnsupportedOperation {
        method: "tools/call".to_string(),
        path: name.to_string(),
    })?;
    let route = router::route_for(operation);

    let mut args = match arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(Error::Validation(format!(
                "Tool arguments must be an object, got {}",
                other
            )))
        }
    };

    let api_key = match args.remove("api_key") {
        Some(Value::String(key)) if !key.trim().is_empty() => Some(key),
        _ => default_api_key.map(String::from),
    };

    let path = if route.pattern.contains("{id}") {
        let id = match args.remove("id") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if id.trim().is_empty() {
            return Err(Error::Validation("id is required".into()));
        }
        route.pattern.replace("{id}", &urlencoding::encode(&id))
    } else {
        route.pattern.to_string()
    };

    let mut request = ContextRequest::new(route.method, path);
    if let Some(key) = api_key {
        request = request.with_api_key(key);
    }

    match route.method {
        "POST" | "PUT" => {
            if !args.is_empty() {
                request = request.with_body(Value::Object(args));
            }
        }
        _ => {
            for (key, value) in args {
                if key == "filters" {
                    if let Value::Object(filters) = value {
                        for (k, v) in filters {
                            if let Some(v) = query_value(v) {
                                request = request.with_query(k, v);
                            }
                        }
                    }
                } else if let Some(v) = query_value(value) {
                    request = request.with_query(key, v);
                }
            }
        }
    }

    Ok(request)
}

/// Stringify a scalar (or array of scalars) for the query string.
fn query_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(query_value).collect();
            Some(parts.join(","))
        }
        Value::Object(_) => None,
    }
}
