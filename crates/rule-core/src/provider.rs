//! Provider trait for the Rule.io API.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Campaign, CreateCustomFieldInput, CreateSubscriberInput, CustomField, ListFilter, Subscriber,
    Tag, UpdateSubscriberInput,
};

/// Operations exposed by a Rule.io backend.
///
/// Every method performs at most one outbound request and never retries.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    /// Get the provider name (e.g., "rule")
    fn provider_name(&self) -> &'static str;

    /// List subscribers
    async fn get_subscribers(&self, filter: ListFilter) -> Result<Vec<Subscriber>>;

    /// Get a single subscriber by id or email
    async fn get_subscriber(&self, id: &str) -> Result<Subscriber>;

    /// Create a subscriber
    async fn create_subscriber(&self, input: CreateSubscriberInput) -> Result<Subscriber>;

    /// Update a subscriber
    async fn update_subscriber(&self, id: &str, input: UpdateSubscriberInput)
        -> Result<Subscriber>;

    /// Delete a subscriber
    async fn delete_subscriber(&self, id: &str) -> Result<()>;

    /// List tags
    async fn get_tags(&self, filter: ListFilter) -> Result<Vec<Tag>>;

    /// Create a tag
    async fn create_tag(&self, name: &str) -> Result<Tag>;

    /// List campaigns
    async fn get_campaigns(&self, filter: ListFilter) -> Result<Vec<Campaign>>;

    /// List custom field definitions
    async fn get_custom_fields(&self, filter: ListFilter) -> Result<Vec<CustomField>>;

    /// Create a custom field definition
    async fn create_custom_field(&self, input: CreateCustomFieldInput) -> Result<CustomField>;
}

/// Builds a provider for a given API key.
///
/// The adapter asks for a fresh provider per request so it never holds
/// per-key state.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn RuleProvider>>;
}

impl<F> ClientFactory for F
where
    F: Fn(&str) -> Result<Arc<dyn RuleProvider>> + Send + Sync,
{
    fn connect(&self, api_key: &str) -> Result<Arc<dyn RuleProvider>> {
        self(api_key)
    }
}
