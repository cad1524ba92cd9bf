//! Rule.io API client for mcp-rule.
//!
//! This crate provides the HTTP integration with the Rule.io v3 REST API
//! for subscribers, tags, campaigns, and custom fields.

mod client;
mod types;

pub use client::{RuleClient, RuleClientFactory};
pub use types::*;

/// Default Rule.io API URL.
pub const DEFAULT_RULE_URL: &str = "https://app.rule.io/api/v3";
