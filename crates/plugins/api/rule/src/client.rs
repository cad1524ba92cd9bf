//! Rule.io API client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use rule_core::{
    Campaign, ClientFactory, CreateCustomFieldInput, CreateSubscriberInput, CustomField, Error,
    ListFilter, Result, RuleProvider, Subscriber, Tag, UpdateSubscriberInput,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{
    CreateFieldRequest, CreateSubscriberRequest, CreateTagRequest, RuleEnvelope, RuleErrorBody,
    RuleListEnvelope, UpdateSubscriberRequest,
};
use crate::DEFAULT_RULE_URL;

/// Rule.io API client.
///
/// Holds the API key and base URL; every operation issues exactly one
/// request and surfaces failures without retrying.
pub struct RuleClient {
    base_url: Url,
    api_key: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for RuleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RuleClient {
    /// Create a new Rule.io client against the public API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_RULE_URL, api_key)
    }

    /// Create a new Rule.io client with a custom base URL.
    ///
    /// Fails with `Unauthorized` when the key is blank, before any request.
    pub fn with_base_url(base_url: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Unauthorized("API key is required".to_string()));
        }

        let base = base_url.as_ref().trim_end_matches('/');
        let base_url = Url::parse(base)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid base URL '{}'", base)));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: None,
            client: build_http_client(None)?,
        })
    }

    /// Set a request timeout. Without one the transport default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(Some(timeout))?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build a URL from path segments. Each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build request with common headers.
    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// Send a request, mapping connectivity failures and error statuses.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Rule.io request failed");
            Error::Http(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let raw = response.text().await.unwrap_or_default();
            let message = RuleErrorBody::message_from(&raw);
            warn!(
                status = status_code,
                message = message.as_str(),
                "Rule.io API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        Ok(response)
    }

    /// Parse a success body into `T`.
    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response: {}", e)))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Authenticated GET with query parameters.
    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(String, String)]) -> Result<T> {
        debug!(url = url.as_str(), "Rule.io GET request");
        let response = self.send(self.request(Method::GET, url).query(query)).await?;
        Self::parse(response).await
    }

    /// Authenticated POST with a JSON body.
    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        debug!(url = url.as_str(), "Rule.io POST request");
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        Self::parse(response).await
    }

    /// Authenticated PUT with a JSON body.
    async fn put<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        debug!(url = url.as_str(), "Rule.io PUT request");
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;
        Self::parse(response).await
    }

    /// Authenticated DELETE. Any success body (including 204) is discarded.
    async fn delete(&self, url: Url) -> Result<()> {
        debug!(url = url.as_str(), "Rule.io DELETE request");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        filter: &ListFilter,
    ) -> Result<Vec<T>> {
        let url = self.url(&[resource])?;
        let envelope: RuleListEnvelope<T> = self.get(url, &list_query(filter)).await?;
        debug!(
            resource = resource,
            count = envelope.data.len(),
            total = ?envelope.pagination.as_ref().map(|p| p.total),
            "Rule.io list response"
        );
        Ok(envelope.data)
    }
}

fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        "mcp-rule/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))
}

/// Query parameters for list endpoints: page, limit, then non-empty filters.
fn list_query(filter: &ListFilter) -> Vec<(String, String)> {
    let mut query = vec![
        ("page".to_string(), filter.page.to_string()),
        ("limit".to_string(), filter.limit.to_string()),
    ];
    query.extend(
        filter
            .filters
            .iter()
            .filter(|(k, v)| !v.is_empty() && k.as_str() != "page" && k.as_str() != "limit")
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    query
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", what)));
    }
    Ok(())
}

/// Ids become one path segment; `.` and `..` would be normalised away.
fn require_id(id: &str) -> Result<()> {
    require(id, "subscriber id")?;
    if matches!(id, "." | "..") {
        return Err(Error::Validation(format!("Invalid subscriber id '{}'", id)));
    }
    Ok(())
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl RuleProvider for RuleClient {
    fn provider_name(&self) -> &'static str {
        "rule"
    }

    async fn get_subscribers(&self, filter: ListFilter) -> Result<Vec<Subscriber>> {
        self.list("subscribers", &filter).await
    }

    async fn get_subscriber(&self, id: &str) -> Result<Subscriber> {
        require_id(id)?;
        let url = self.url(&["subscribers", id])?;
        let envelope: RuleEnvelope<Subscriber> = self.get(url, &[]).await?;
        Ok(envelope.data)
    }

    async fn create_subscriber(&self, input: CreateSubscriberInput) -> Result<Subscriber> {
        require(&input.email, "email")?;
        let url = self.url(&["subscribers"])?;
        let request = CreateSubscriberRequest {
            email: input.email,
            tags: input.tags,
            fields: input.fields,
        };
        let envelope: RuleEnvelope<Subscriber> = self.post(url, &request).await?;
        Ok(envelope.data)
    }

    async fn update_subscriber(
        &self,
        id: &str,
        input: UpdateSubscriberInput,
    ) -> Result<Subscriber> {
        require_id(id)?;
        if input.is_empty() {
            return Err(Error::Validation(
                "at least one of email, tags or fields must be set".to_string(),
            ));
        }
        if let Some(email) = &input.email {
            require(email, "email")?;
        }
        let url = self.url(&["subscribers", id])?;
        let request = UpdateSubscriberRequest {
            email: input.email,
            tags: input.tags,
            fields: input.fields,
        };
        let envelope: RuleEnvelope<Subscriber> = self.put(url, &request).await?;
        Ok(envelope.data)
    }

    async fn delete_subscriber(&self, id: &str) -> Result<()> {
        require_id(id)?;
        let url = self.url(&["subscribers", id])?;
        self.delete(url).await
    }

    async fn get_tags(&self, filter: ListFilter) -> Result<Vec<Tag>> {
        self.list("tags", &filter).await
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        require(name, "tag name")?;
        let url = self.url(&["tags"])?;
        let request = CreateTagRequest {
            name: name.to_string(),
        };
        let envelope: RuleEnvelope<Tag> = self.post(url, &request).await?;
        Ok(envelope.data)
    }

    async fn get_campaigns(&self, filter: ListFilter) -> Result<Vec<Campaign>> {
        self.list("campaigns", &filter).await
    }

    async fn get_custom_fields(&self, filter: ListFilter) -> Result<Vec<CustomField>> {
        self.list("fields", &filter).await
    }

    async fn create_custom_field(&self, input: CreateCustomFieldInput) -> Result<CustomField> {
        require(&input.name, "field name")?;
        require(&input.field_type, "field type")?;
        let url = self.url(&["fields"])?;
        let request = CreateFieldRequest {
            name: input.name,
            field_type: input.field_type,
            default_value: input.default_value,
        };
        let envelope: RuleEnvelope<CustomField> = self.post(url, &request).await?;
        Ok(envelope.data)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds a [`RuleClient`] per API key with shared base URL and timeout.
#[derive(Debug, Clone, Default)]
pub struct RuleClientFactory {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl RuleClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ClientFactory for RuleClientFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn RuleProvider>> {
        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_RULE_URL);
        let mut client = RuleClient::with_base_url(base_url, api_key)?;
        if let Some(timeout) = self.timeout {
            client = client.with_timeout(timeout)?;
        }
        Ok(Arc::new(client))
    }
}

// =============================================================================
// Tests
// =============================================================================
