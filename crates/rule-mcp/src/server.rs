//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Tool calls and raw context requests - run through the adapter
//! 3. EOF on stdin - shutdown

use serde::Serialize;
use serde_json::Value;

use crate::context::ContextRequest;
use crate::handlers::ToolHandler;
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::transport::{IncomingMessage, StdioTransport};

/// Server name reported on initialize.
pub const SERVER_NAME: &str = "mcp-rule";

/// MCP server for Rule.io.
pub struct McpServer {
    handler: ToolHandler,
    initialized: bool,
}

impl McpServer {
    pub fn new(handler: ToolHandler) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    /// Serve on stdin/stdout until EOF.
    pub async fn run(&mut self) -> rule_core::Result<()> {
        self.run_with(StdioTransport::stdio()).await
    }

    /// Serve on the given transport until EOF. Messages are handled one at a time.
    pub async fn run_with(&mut self, mut transport: StdioTransport) -> rule_core::Result<()> {
        tracing::info!(
            tools = self.handler.available_tools().len(),
            "Starting MCP server"
        );

        loop {
            match transport.read_message() {
                Ok(Some(msg)) => {
                    if let Some(resp) = self.handle_message(msg).await {
                        if let Err(e) = transport.write_response(&resp) {
                            tracing::error!(error = %e, "Failed to write response");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    let error_resp = JsonRpcResponse::error(
                        RequestId::Null,
                        JsonRpcError::parse_error(&e.to_string()),
                    );
                    if let Err(e) = transport.write_response(&error_resp) {
                        tracing::error!(error = %e, "Failed to write response");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Transport error");
                    break;
                }
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle an incoming message. Notifications get no response.
    async fn handle_message(&mut self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    async fn handle_request(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %req.method, id = ?req.id, "Handling request");

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "context/request" => self.handle_context_request(req.id, req.params).await,
            "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
            method => {
                tracing::warn!(method, "Unknown method");
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" | "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Request cancelled by client"),
            _ => tracing::debug!(method, "Ignoring notification"),
        }
    }

    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => tracing::info!(
                    client = %init.client_info.name,
                    version = %init.client_info.version,
                    protocol = %init.protocol_version,
                    "Client connected"
                ),
                Err(e) => tracing::warn!(error = %e, "Failed to parse initialize params"),
            }
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        respond(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.handler.available_tools(),
        };
        respond(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match parse_params(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        tracing::info!(tool = %params.name, "Calling tool");

        let result = self.handler.execute(&params.name, params.arguments).await;
        respond(id, &result)
    }

    async fn handle_context_request(
        &self,
        id: RequestId,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let request: ContextRequest = match parse_params(params) {
            Ok(request) => request,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        let response = self.handler.handle_context_request(&request).await;
        respond(id, &response)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
}

fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(&e.to_string())),
    }
}
