//! Context adapter: turns a [`ContextRequest`] into a client call.
//!
//! The adapter is stateless. Every request carries its own API key, a client
//! is obtained from the [`ClientFactory`] for that key, the matching route's
//! operation runs once, and the outcome is folded into a [`ContextResponse`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rule_core::{
    ClientFactory, CreateCustomFieldInput, CreateSubscriberInput, Error, ListFilter, Result,
    RuleProvider, UpdateSubscriberInput, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::{ContextRequest, ContextResponse};
use crate::router::{self, Operation};

/// Dispatches context requests to Rule.io clients.
#[derive(Clone)]
pub struct ContextProvider {
    factory: Arc<dyn ClientFactory>,
}

impl ContextProvider {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    /// Handle one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: &ContextRequest) -> ContextResponse {
        debug!(method = %request.method, path = %request.path, "Handling context request");

        match self.dispatch(request).await {
            Ok(value) => ContextResponse::success(&value),
            Err(e) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    code = e.code(),
                    error = %e,
                    "Context request failed"
                );
                ContextResponse::from_error(&e)
            }
        }
    }

    async fn dispatch(&self, request: &ContextRequest) -> Result<Value> {
        let api_key = request
            .api_key()
            .ok_or_else(|| Error::Unauthorized("Missing API key in request metadata".into()))?;

        let route = router::resolve(&request.method, &request.path)?;
        let client = self.factory.connect(api_key)?;
        let id = route.id.as_deref().unwrap_or_default();

        match route.operation {
            Operation::ListSubscribers => {
                let filter = list_filter(&request.query_params, true)?;
                let (page, limit) = (filter.page, filter.limit);
                let items = client.get_subscribers(filter).await?;
                list_body(route.operation, items, page, limit)
            }
            Operation::GetSubscriber => Ok(serde_json::to_value(client.get_subscriber(id).await?)?),
            Operation::CreateSubscriber => {
                let payload: SubscriberPayload = parse_payload(request)?;
                let input = CreateSubscriberInput {
                    email: payload
                        .email
                        .ok_or_else(|| Error::Validation("email is required".into()))?,
                    tags: payload.tags.unwrap_or_default(),
                    fields: payload.fields.unwrap_or_default(),
                };
                Ok(serde_json::to_value(client.create_subscriber(input).await?)?)
            }
            Operation::UpdateSubscriber => {
                let payload: SubscriberPayload = parse_payload(request)?;
                let input = UpdateSubscriberInput {
                    email: payload.email,
                    tags: payload.tags,
                    fields: payload.fields,
                };
                Ok(serde_json::to_value(client.update_subscriber(id, input).await?)?)
            }
            Operation::DeleteSubscriber => {
                client.delete_subscriber(id).await?;
                Ok(serde_json::json!({ "success": true }))
            }
            Operation::ListTags => self.list(&*client, route.operation, request).await,
            Operation::CreateTag => {
                let payload: TagPayload = parse_payload(request)?;
                let name = payload
                    .name
                    .ok_or_else(|| Error::Validation("name is required".into()))?;
                Ok(serde_json::to_value(client.create_tag(&name).await?)?)
            }
            Operation::ListCampaigns => self.list(&*client, route.operation, request).await,
            Operation::ListCustomFields => self.list(&*client, route.operation, request).await,
            Operation::CreateCustomField => {
                let payload: FieldPayload = parse_payload(request)?;
                let input = CreateCustomFieldInput {
                    name: payload
                        .name
                        .ok_or_else(|| Error::Validation("name is required".into()))?,
                    field_type: payload
                        .field_type
                        .ok_or_else(|| Error::Validation("type is required".into()))?,
                    default_value: payload.default_value,
                };
                Ok(serde_json::to_value(client.create_custom_field(input).await?)?)
            }
        }
    }

    /// Unfiltered list routes share paging handling.
    async fn list(
        &self,
        client: &dyn RuleProvider,
        operation: Operation,
        request: &ContextRequest,
    ) -> Result<Value> {
        let filter = list_filter(&request.query_params, false)?;
        let (page, limit) = (filter.page, filter.limit);
        match operation {
            Operation::ListTags => list_body(operation, client.get_tags(filter).await?, page, limit),
            Operation::ListCampaigns => {
                list_body(operation, client.get_campaigns(filter).await?, page, limit)
            }
            _ => list_body(operation, client.get_custom_fields(filter).await?, page, limit),
        }
    }
}

/// `{"<resource>": [...], "page", "limit", "total"}`
fn list_body<T: serde::Serialize>(
    operation: Operation,
    items: Vec<T>,
    page: u32,
    limit: u32,
) -> Result<Value> {
    let key = operation.resource_key().unwrap_or("items");
    let total = items.len();

    let mut body = Map::new();
    body.insert(key.to_string(), serde_json::to_value(items)?);
    body.insert("page".into(), page.into());
    body.insert("limit".into(), limit.into());
    body.insert("total".into(), total.into());
    Ok(Value::Object(body))
}

/// Paging from query params; remaining params become filters when allowed.
fn list_filter(query: &BTreeMap<String, String>, with_filters: bool) -> Result<ListFilter> {
    let page = positive(query, "page")?.unwrap_or(DEFAULT_PAGE);
    let limit = positive(query, "limit")?.unwrap_or(DEFAULT_LIMIT);

    let filters = if with_filters {
        query
            .iter()
            .filter(|(k, v)| k.as_str() != "page" && k.as_str() != "limit" && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    } else {
        BTreeMap::new()
    };

    Ok(ListFilter {
        page,
        limit,
        filters,
    })
}

fn positive(query: &BTreeMap<String, String>, key: &str) -> Result<Option<u32>> {
    match query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(Error::Validation(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))),
        },
    }
}

/// Merge query params and body (body wins) and deserialize the result.
fn parse_payload<T: DeserializeOwned>(request: &ContextRequest) -> Result<T> {
    let mut merged: Map<String, Value> = request
        .query_params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    match &request.body {
        None | Some(Value::Null) => {}
        Some(Value::Object(obj)) => merged.extend(obj.clone()),
        Some(Value::String(raw)) if raw.trim().is_empty() => {}
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => merged.extend(obj),
            Ok(_) => return Err(Error::Validation("body must be a JSON object".into())),
            Err(e) => return Err(Error::Validation(format!("body is not valid JSON: {}", e))),
        },
        Some(_) => return Err(Error::Validation("body must be a JSON object".into())),
    }

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| Error::Validation(format!("Invalid request payload: {}", e)))
}

#[derive(Debug, Default, Deserialize)]
struct SubscriberPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default, deserialize_with = "tag_list")]
    tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "field_map")]
    fields: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct TagPayload {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FieldPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type", alias = "field_type")]
    field_type: Option<String>,
    #[serde(default)]
    default_value: Option<Value>,
}

/// Tags as a JSON array or a comma-separated string.
fn tag_list<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!(
                    "tags must be strings, got {}",
                    other
                ))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(serde::de::Error::custom(format!(
            "tags must be an array or comma-separated string, got {}",
            other
        ))),
    }
}

/// Fields as a JSON object, or a string holding one (query params are strings).
fn field_map<'de, D>(deserializer: D) -> std::result::Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(serde::de::Error::custom("fields must be a JSON object")),
        },
        Some(_) => Err(serde::de::Error::custom("fields must be a JSON object")),
    }
}
