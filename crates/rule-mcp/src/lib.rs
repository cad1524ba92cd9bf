//! MCP (Model Context Protocol) server and context adapter for Rule.io.
//!
//! Two surfaces share one dispatch path:
//!
//! - [`ContextProvider`] takes a [`ContextRequest`] (method, path, query
//!   params, body, API key) and returns a [`ContextResponse`];
//! - [`McpServer`] speaks JSON-RPC over stdio and exposes each route as a tool.

pub mod context;
pub mod handlers;
pub mod protocol;
pub mod provider;
pub mod router;
pub mod server;
pub mod tools;
pub mod transport;

pub use context::{ContextRequest, ContextResponse, ErrorBody, RequestMetadata, ResponseBody};
pub use handlers::ToolHandler;
pub use provider::ContextProvider;
pub use server::McpServer;
