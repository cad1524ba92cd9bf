//! End-to-end tests of the context adapter against an in-memory Rule.io.
//!
//! These run the full request path (route lookup, payload parsing, provider
//! call, response shaping) without any network.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{fake_adapter, FakeRule, TEST_KEY};
use rule_core::{CreateSubscriberInput, Error, RuleProvider, UpdateSubscriberInput};
use rule_mcp::{ContextRequest, ContextResponse, ToolHandler};
use serde_json::{json, Value};

fn body(resp: &ContextResponse) -> Value {
    assert!(resp.is_success(), "expected success, got {:?}", resp);
    resp.json().unwrap()
}

fn error_code(resp: &ContextResponse) -> &str {
    &resp.error().expect("expected an error response").error_code
}

#[tokio::test]
async fn test_list_subscribers_respects_limit() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::with_subscribers(25)));

    let req = ContextRequest::new("GET", "/subscribers")
        .with_query("limit", "10")
        .with_api_key(TEST_KEY);
    let resp = adapter.handle(&req).await;

    assert_eq!(resp.status, 200);
    let body = body(&resp);
    let subscribers = body["subscribers"].as_array().unwrap();
    assert!(subscribers.len() <= 10);
    assert_eq!(subscribers.len(), 10);
    assert_eq!(body["limit"], 10);
}

#[tokio::test]
async fn test_second_page() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::with_subscribers(25)));

    let req = ContextRequest::new("GET", "/subscribers")
        .with_query("limit", "10")
        .with_query("page", "3")
        .with_api_key(TEST_KEY);
    let body = body(&adapter.handle(&req).await);

    assert_eq!(body["subscribers"].as_array().unwrap().len(), 5);
    assert_eq!(body["page"], 3);
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::new()));

    let create = ContextRequest::new("POST", "/subscribers")
        .with_body(json!({
            "email": "jane@example.com",
            "tags": ["vip", "newsletter"],
            "fields": {"first_name": "Jane", "age": 31}
        }))
        .with_api_key(TEST_KEY);
    let created = body(&adapter.handle(&create).await);

    assert_eq!(created["email"], "jane@example.com");
    assert_eq!(created["tags"], json!(["vip", "newsletter"]));

    let id = created["id"].as_str().unwrap();
    let get = ContextRequest::new("GET", format!("/subscribers/{}", id)).with_api_key(TEST_KEY);
    let fetched = body(&adapter.handle(&get).await);

    assert_eq!(fetched["email"], created["email"]);
    assert_eq!(fetched["tags"], created["tags"]);
    assert_eq!(fetched["fields"], json!({"first_name": "Jane", "age": 31}));
}

#[tokio::test]
async fn test_get_by_email() {
    let fake = Arc::new(FakeRule::new());
    fake.create_subscriber(CreateSubscriberInput {
        email: "bob@example.com".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let (adapter, _) = fake_adapter(fake);

    let req = ContextRequest::new("GET", "/subscribers/bob@example.com").with_api_key(TEST_KEY);
    assert_eq!(body(&adapter.handle(&req).await)["email"], "bob@example.com");
}

#[tokio::test]
async fn test_get_by_encoded_email() {
    let fake = Arc::new(FakeRule::new());
    fake.create_subscriber(CreateSubscriberInput {
        email: "jane@example.com".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let (adapter, _) = fake_adapter(fake);

    let req = ContextRequest::new("GET", "/subscribers/jane%40example.com").with_api_key(TEST_KEY);
    assert_eq!(body(&adapter.handle(&req).await)["email"], "jane@example.com");
}

#[tokio::test]
async fn test_delete_tool_targets_the_named_subscriber() {
    let fake = Arc::new(FakeRule::with_subscribers(1));
    fake.create_subscriber(CreateSubscriberInput {
        email: "1?x@example.com".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let (adapter, _) = fake_adapter(fake.clone());
    let handler = ToolHandler::new(adapter).with_default_api_key(Some(TEST_KEY.to_string()));

    let result = handler
        .execute("delete_subscriber", Some(json!({"id": "1?x@example.com"})))
        .await;

    assert!(result.is_error.is_none());
    assert_eq!(fake.subscriber_count(), 1);
    assert!(fake.get_subscriber("1").await.is_ok());
    assert!(fake.get_subscriber("1?x@example.com").await.is_err());
}

#[tokio::test]
async fn test_blank_id_tool_call_is_rejected() {
    let (adapter, connects) = fake_adapter(Arc::new(FakeRule::with_subscribers(2)));
    let handler = ToolHandler::new(adapter).with_default_api_key(Some(TEST_KEY.to_string()));

    let result = handler
        .execute("get_subscriber", Some(json!({"id": ""})))
        .await;

    assert_eq!(result.is_error, Some(true));
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_keeps_unset_fields() {
    let fake = Arc::new(FakeRule::new());
    let created = fake
        .create_subscriber(CreateSubscriberInput {
            email: "keep@example.com".into(),
            tags: vec!["a".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    let (adapter, _) = fake_adapter(fake);

    let req = ContextRequest::new("PUT", format!("/subscribers/{}", created.id))
        .with_body(json!("{\"tags\": \"b, c\"}"))
        .with_api_key(TEST_KEY);
    let updated = body(&adapter.handle(&req).await);

    assert_eq!(updated["email"], "keep@example.com");
    assert_eq!(updated["tags"], json!(["b", "c"]));
}

#[tokio::test]
async fn test_delete_twice_is_not_found() {
    let fake = Arc::new(FakeRule::with_subscribers(1));
    let (adapter, _) = fake_adapter(fake.clone());

    let req = ContextRequest::new("DELETE", "/subscribers/1").with_api_key(TEST_KEY);

    let first = adapter.handle(&req).await;
    assert_eq!(body(&first), json!({"success": true}));
    assert_eq!(fake.subscriber_count(), 0);

    let second = adapter.handle(&req).await;
    assert_eq!(second.status, 404);
    assert_eq!(error_code(&second), "NotFoundError");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::with_subscribers(2)));

    for req in [
        ContextRequest::new("GET", "/subscribers/999"),
        ContextRequest::new("PUT", "/subscribers/999").with_body(json!({"email": "x@example.com"})),
        ContextRequest::new("DELETE", "/subscribers/999"),
    ] {
        let resp = adapter.handle(&req.with_api_key(TEST_KEY)).await;
        assert_eq!(error_code(&resp), "NotFoundError");
        assert!(resp.json().unwrap().get("email").is_none());
    }
}

#[tokio::test]
async fn test_unknown_path_is_unsupported() {
    let (adapter, connects) = fake_adapter(Arc::new(FakeRule::new()));

    for (method, path) in [("GET", "/unknown"), ("POST", "/campaigns"), ("PATCH", "/tags")] {
        let req = ContextRequest::new(method, path).with_api_key(TEST_KEY);
        let resp = adapter.handle(&req).await;
        assert_eq!(resp.status, 404);
        assert_eq!(error_code(&resp), "UnsupportedOperationError");
    }
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_api_key_before_any_client() {
    let (adapter, connects) = fake_adapter(Arc::new(FakeRule::with_subscribers(3)));

    for req in [
        ContextRequest::new("GET", "/subscribers"),
        ContextRequest::new("GET", "/subscribers").with_api_key(""),
        ContextRequest::new("DELETE", "/subscribers/1"),
    ] {
        let resp = adapter.handle(&req).await;
        assert_eq!(resp.status, 401);
        assert_eq!(error_code(&resp), "AuthenticationError");
    }
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_api_key() {
    let (adapter, connects) = fake_adapter(Arc::new(FakeRule::new()));

    let req = ContextRequest::new("GET", "/tags").with_api_key("wrong");
    let resp = adapter.handle(&req).await;

    assert_eq!(error_code(&resp), "AuthenticationError");
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tags_and_fields() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::new()));

    let tag = body(
        &adapter
            .handle(
                &ContextRequest::new("POST", "/tags")
                    .with_query("name", "vip")
                    .with_api_key(TEST_KEY),
            )
            .await,
    );
    assert_eq!(tag["name"], "vip");

    let tags = body(&adapter.handle(&ContextRequest::new("GET", "/tags").with_api_key(TEST_KEY)).await);
    assert_eq!(tags["tags"].as_array().unwrap().len(), 1);
    assert_eq!(tags["total"], 1);

    let field = body(
        &adapter
            .handle(
                &ContextRequest::new("POST", "/fields")
                    .with_body(json!({"name": "city", "type": "text", "default_value": "Oslo"}))
                    .with_api_key(TEST_KEY),
            )
            .await,
    );
    assert_eq!(field["type"], "text");
    assert_eq!(field["default_value"], "Oslo");

    let fields =
        body(&adapter.handle(&ContextRequest::new("GET", "/fields/").with_api_key(TEST_KEY)).await);
    assert_eq!(fields["fields"][0]["name"], "city");
}

#[tokio::test]
async fn test_campaigns_listing() {
    let (adapter, _) = fake_adapter(Arc::new(FakeRule::new()));

    let req = ContextRequest::new("get", "/campaigns").with_api_key(TEST_KEY);
    let body = body(&adapter.handle(&req).await);

    assert_eq!(body["campaigns"][0]["name"], "Welcome");
    assert_eq!(body["campaigns"][0]["type"], "email");
}

#[tokio::test]
async fn test_create_echoes_email_and_tags() {
    let fake = FakeRule::new();

    for (email, tags) in [
        ("a@example.com", vec![]),
        ("b@example.com", vec!["one".to_string()]),
        ("c@example.com", vec!["x".to_string(), "y".to_string(), "z".to_string()]),
    ] {
        let created = fake
            .create_subscriber(CreateSubscriberInput {
                email: email.to_string(),
                tags: tags.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.email, email);
        assert_eq!(created.tags, tags);
    }
}

#[tokio::test]
async fn test_empty_update_is_validation_error() {
    let fake = FakeRule::with_subscribers(1);
    let err = fake
        .update_subscriber("1", UpdateSubscriberInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
