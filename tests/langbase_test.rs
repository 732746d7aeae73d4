//! Integration tests for the Langbase client and pipe backends
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use std::sync::Arc;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use mcp_truth_dao::config::{BackendDescriptor, LangbaseConfig, RequestConfig};
use mcp_truth_dao::error::{LangbaseError, ReasoningError};
use mcp_truth_dao::langbase::{LangbaseClient, Message, PipeBackend, PipeRequest};
use mcp_truth_dao::stages::{ReasoningBackend, ReasoningInvoker};

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str) -> LangbaseClient {
    let config = LangbaseConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_output_tokens: 1024,
    };

    LangbaseClient::new(&config, request_config).expect("Failed to create client")
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "completion": text,
        "threadId": "thread-123",
        "raw": {
            "model": "google:gemini-1.5-flash",
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        }
    }))
}

fn descriptor(pipe: &str) -> BackendDescriptor {
    BackendDescriptor {
        pipe: pipe.to_string(),
        model: format!("google:{}", pipe),
    }
}

mod pipe_call_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_pipe_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(body_partial_json(json!({"name": "truthdao-flash", "stream": false})))
            .respond_with(completion("A verdict."))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let request = PipeRequest::new("truthdao-flash", vec![Message::user("claim")]);
        let response = client.call_pipe(request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.completion, "A verdict.");
        assert_eq!(response.thread_id.as_deref(), Some("thread-123"));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .call_pipe(PipeRequest::new("p", vec![Message::user("x")]))
            .await
            .unwrap_err();

        match err {
            LangbaseError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsuccessful_run_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "completion": ""})),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .call_pipe(PipeRequest::new("p", vec![Message::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LangbaseError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .call_pipe(PipeRequest::new("p", vec![Message::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LangbaseError::InvalidResponse { .. }));
    }
}

mod ensure_pipes_tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_pipe_conflict_is_ok() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .and(body_partial_json(json!({"name": "a", "upsert": true})))
            .respond_with(ResponseTemplate::new(409).set_body_string("exists"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        client.ensure_backend_pipes(&[descriptor("a")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_ready_backend_is_enough() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .and(body_partial_json(json!({"name": "good"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "good",
                "description": "",
                "status": "public",
                "owner_login": "truthdao",
                "url": "https://langbase.com/truthdao/good"
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .and(body_partial_json(json!({"name": "bad"})))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        client
            .ensure_backend_pipes(&[descriptor("bad"), descriptor("good")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_failing_backends_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .ensure_backend_pipes(&[descriptor("a"), descriptor("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, LangbaseError::Api { status: 401, .. }));
    }
}

mod fallback_tests {
    use super::*;

    fn invoker(client: &LangbaseClient, pipes: &[&str]) -> ReasoningInvoker {
        let descriptors: Vec<_> = pipes.iter().map(|p| descriptor(p)).collect();
        let backends: Vec<Arc<dyn ReasoningBackend>> =
            PipeBackend::from_descriptors(client, &descriptors)
                .into_iter()
                .map(|b| Arc::new(b) as Arc<dyn ReasoningBackend>)
                .collect();
        ReasoningInvoker::new(backends)
    }

    #[tokio::test]
    async fn test_falls_through_to_next_pipe() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({"name": "primary"})))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({"name": "secondary", "temperature": 0.1})))
            .respond_with(completion("from secondary"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = invoker(&client, &["primary", "secondary"])
            .invoke(vec![Message::user("x")], 0.1)
            .await
            .unwrap();

        assert_eq!(result.backend, "secondary");
        assert_eq!(result.text, "from secondary");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].backend, "primary");
    }

    #[tokio::test]
    async fn test_all_pipes_failing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = invoker(&client, &["a", "b"])
            .invoke(vec![Message::user("x")], 0.1)
            .await
            .unwrap_err();

        let ReasoningError::AllBackendsExhausted { attempts, .. } = err;
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_max_tokens_defaults_to_client_cap() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({"max_tokens": 1024})))
            .respond_with(completion("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        invoker(&client, &["a"])
            .invoke(vec![Message::user("x")], 0.1)
            .await
            .unwrap();
    }
}
