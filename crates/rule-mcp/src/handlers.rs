//! Tool handlers for MCP server.
//!
//! Tool calls are translated into context requests and run through the
//! [`ContextProvider`], so the MCP surface and the raw adapter share one
//! dispatch path.

use serde_json::Value;

use crate::context::{ContextRequest, ContextResponse};
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::provider::ContextProvider;
use crate::tools;

/// Tool handler that executes tools through the context adapter.
pub struct ToolHandler {
    provider: ContextProvider,
    default_api_key: Option<String>,
}

impl ToolHandler {
    /// Create a new tool handler.
    pub fn new(provider: ContextProvider) -> Self {
        Self {
            provider,
            default_api_key: None,
        }
    }

    /// API key used when a tool call does not carry its own.
    pub fn with_default_api_key(mut self, api_key: Option<String>) -> Self {
        self.default_api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        tools::available_tools()
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let request = match tools::build_request(name, arguments, self.default_api_key.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Invalid tool call");
                return ToolCallResult::error(ContextResponse::from_error(&e).text());
            }
        };

        let response = self.provider.handle(&request).await;
        if response.is_success() {
            ToolCallResult::text(response.text())
        } else {
            ToolCallResult::error(response.text())
        }
    }

    /// Run a raw context request. The default key is not injected.
    pub async fn handle_context_request(&self, request: &ContextRequest) -> ContextResponse {
        self.provider.handle(request).await
    }
}
