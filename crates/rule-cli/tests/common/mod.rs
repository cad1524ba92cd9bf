//! Common test utilities.
//!
//! - `FakeRule`: in-memory `RuleProvider` that behaves like the Rule.io API
//!   for subscribers and tags (ids are assigned sequentially, unknown ids are
//!   `NotFound`, deletes are not idempotent).
//! - `fake_adapter`: a `ContextProvider` wired to a shared `FakeRule`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rule_core::{
    Campaign, CreateCustomFieldInput, CreateSubscriberInput, CustomField, Error, ListFilter,
    Result, RuleProvider, Subscriber, Tag, UpdateSubscriberInput,
};
use rule_mcp::ContextProvider;
use serde_json::json;

/// API key accepted by the fake.
pub const TEST_KEY: &str = "test-api-key";

#[derive(Default)]
struct State {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    tags: Vec<Tag>,
    fields: Vec<CustomField>,
}

/// In-memory Rule.io stand-in.
#[derive(Default)]
pub struct FakeRule {
    state: Mutex<State>,
}

impl FakeRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with `count` subscribers.
    pub fn with_subscribers(count: usize) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.state.lock().unwrap();
            for i in 0..count {
                state.next_id += 1;
                let id = state.next_id;
                state.subscribers.push(subscriber(id, &format!("user{}@example.com", i), &[]));
            }
        }
        fake
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }
}

fn subscriber(id: u64, email: &str, tags: &[String]) -> Subscriber {
    serde_json::from_value(json!({
        "id": id,
        "email": email,
        "tags": tags,
        "status": "active",
        "created": "2024-01-01T00:00:00Z"
    }))
    .unwrap()
}

fn page<T: Clone>(items: &[T], filter: &ListFilter) -> Vec<T> {
    let start = (filter.page.saturating_sub(1) as usize) * filter.limit as usize;
    items
        .iter()
        .skip(start)
        .take(filter.limit as usize)
        .cloned()
        .collect()
}

fn find_index(subscribers: &[Subscriber], id: &str) -> Result<usize> {
    subscribers
        .iter()
        .position(|s| s.id == id || s.email == id)
        .ok_or_else(|| Error::NotFound(format!("Subscriber {}", id)))
}

#[async_trait]
impl RuleProvider for FakeRule {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn get_subscribers(&self, filter: ListFilter) -> Result<Vec<Subscriber>> {
        let state = self.state.lock().unwrap();
        Ok(page(&state.subscribers, &filter))
    }

    async fn get_subscriber(&self, id: &str) -> Result<Subscriber> {
        let state = self.state.lock().unwrap();
        let index = find_index(&state.subscribers, id)?;
        Ok(state.subscribers[index].clone())
    }

    async fn create_subscriber(&self, input: CreateSubscriberInput) -> Result<Subscriber> {
        if input.email.trim().is_empty() {
            return Err(Error::Validation("email is required".into()));
        }
        let mut state = self.state.lock().unwrap();
        if state.subscribers.iter().any(|s| s.email == input.email) {
            return Err(Error::Validation(format!("{} already exists", input.email)));
        }
        state.next_id += 1;
        let mut created = subscriber(state.next_id, &input.email, &input.tags);
        created.fields = input.fields;
        state.subscribers.push(created.clone());
        Ok(created)
    }

    async fn update_subscriber(&self, id: &str, input: UpdateSubscriberInput) -> Result<Subscriber> {
        if input.is_empty() {
            return Err(Error::Validation("nothing to update".into()));
        }
        let mut state = self.state.lock().unwrap();
        let index = find_index(&state.subscribers, id)?;
        let record = &mut state.subscribers[index];
        if let Some(email) = input.email {
            record.email = email;
        }
        if let Some(tags) = input.tags {
            record.tags = tags;
        }
        if let Some(fields) = input.fields {
            record.fields.extend(fields);
        }
        Ok(record.clone())
    }

    async fn delete_subscriber(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let index = find_index(&state.subscribers, id)?;
        state.subscribers.remove(index);
        Ok(())
    }

    async fn get_tags(&self, filter: ListFilter) -> Result<Vec<Tag>> {
        let state = self.state.lock().unwrap();
        Ok(page(&state.tags, &filter))
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let tag: Tag = serde_json::from_value(json!({"id": state.next_id, "name": name}))?;
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn get_campaigns(&self, _filter: ListFilter) -> Result<Vec<Campaign>> {
        Ok(vec![serde_json::from_value(json!({
            "id": 1,
            "name": "Welcome",
            "status": "sent",
            "type": "email"
        }))?])
    }

    async fn get_custom_fields(&self, filter: ListFilter) -> Result<Vec<CustomField>> {
        let state = self.state.lock().unwrap();
        Ok(page(&state.fields, &filter))
    }

    async fn create_custom_field(&self, input: CreateCustomFieldInput) -> Result<CustomField> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let field: CustomField = serde_json::from_value(json!({
            "id": state.next_id,
            "name": input.name,
            "type": input.field_type,
            "default_value": input.default_value
        }))?;
        state.fields.push(field.clone());
        Ok(field)
    }
}

/// Adapter backed by `fake`. The returned counter tracks client construction.
pub fn fake_adapter(fake: Arc<FakeRule>) -> (ContextProvider, Arc<AtomicUsize>) {
    let connects = Arc::new(AtomicUsize::new(0));
    let counter = connects.clone();
    let factory = move |key: &str| -> Result<Arc<dyn RuleProvider>> {
        counter.fetch_add(1, Ordering::SeqCst);
        if key != TEST_KEY {
            return Err(Error::Unauthorized("Invalid API key".into()));
        }
        Ok(fake.clone())
    };
    (ContextProvider::new(Arc::new(factory)), connects)
}
