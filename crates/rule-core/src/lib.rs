//! Core traits, types, and error handling for mcp-rule.
//!
//! This crate provides the foundational abstractions shared by the Rule.io
//! client, the MCP adapter, and the CLI.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{Config, RuleConfig};
pub use error::{Error, Result};
pub use provider::{ClientFactory, RuleProvider};
pub use types::*;
