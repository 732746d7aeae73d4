//! Unit tests for Langbase API types.
//!
//! Tests request/response serialization and builder patterns for
//! pipe runs and pipe creation.

use super::*;
use serde_json::json;

// Message tests
#[test]
fn test_message_constructors() {
    let msg = Message::system("You are a fact-checker");
    assert_eq!(msg.role, MessageRole::System);
    assert_eq!(msg.content, "You are a fact-checker");

    assert_eq!(Message::user("claim").role, MessageRole::User);
    assert_eq!(Message::assistant("verdict").role, MessageRole::Assistant);
}

#[test]
fn test_message_role_serializes_lowercase() {
    let json = serde_json::to_value(Message::system("x")).unwrap();
    assert_eq!(json["role"], "system");
}

// PipeRequest tests
#[test]
fn test_pipe_request_new() {
    let req = PipeRequest::new("test-pipe", vec![Message::user("test")]);
    assert_eq!(req.name, "test-pipe");
    assert_eq!(req.messages.len(), 1);
    assert!(!req.stream);
    assert!(req.temperature.is_none());
    assert!(req.max_tokens.is_none());
}

#[test]
fn test_pipe_request_overrides_serialize() {
    let req = PipeRequest::new("p", vec![])
        .with_temperature(0.0)
        .with_max_tokens(512);
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["temperature"], json!(0.0));
    assert_eq!(json["max_tokens"], 512);
    assert_eq!(json["stream"], false);
}

#[test]
fn test_pipe_request_omits_unset_overrides() {
    let json = serde_json::to_value(PipeRequest::new("p", vec![])).unwrap();
    assert!(json.get("temperature").is_none());
    assert!(json.get("max_tokens").is_none());
}

// PipeResponse tests
#[test]
fn test_pipe_response_deserialize() {
    let response: PipeResponse = serde_json::from_value(json!({
        "success": true,
        "completion": "{\"score\": 72}",
        "threadId": "thread-1",
        "raw": {
            "model": "gemini-1.5-flash",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }
    }))
    .unwrap();

    assert!(response.success);
    assert_eq!(response.completion, "{\"score\": 72}");
    assert_eq!(response.thread_id.as_deref(), Some("thread-1"));
    let usage = response.raw.unwrap().usage.unwrap();
    assert_eq!(usage.total_tokens, Some(15));
}

#[test]
fn test_pipe_response_minimal() {
    let response: PipeResponse = serde_json::from_value(json!({
        "success": true,
        "completion": "ok",
        "threadId": null
    }))
    .unwrap();
    assert!(response.raw.is_none());
}

// CreatePipeRequest tests
#[test]
fn test_create_pipe_request_builder() {
    let req = CreatePipeRequest::new("truthdao-flash")
        .with_description("backend")
        .with_model("google:gemini-1.5-flash")
        .with_upsert(true)
        .with_store(false)
        .with_max_tokens(8192);

    assert_eq!(req.name, "truthdao-flash");
    assert_eq!(req.description.as_deref(), Some("backend"));
    assert_eq!(req.model.as_deref(), Some("google:gemini-1.5-flash"));
    assert_eq!(req.upsert, Some(true));
    assert_eq!(req.store, Some(false));
    assert_eq!(req.max_tokens, Some(8192));
}

#[test]
fn test_create_pipe_request_skips_none() {
    let json = serde_json::to_string(&CreatePipeRequest::new("p")).unwrap();
    assert_eq!(json, r#"{"name":"p"}"#);
}
