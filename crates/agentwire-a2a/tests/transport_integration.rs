#![allow(clippy::unwrap_used, clippy::expect_used)]

//! HTTP-level tests for `HttpTransport` and `TaskLifecycleClient` against a
//! mocked agent endpoint.

use agentwire_a2a::{
    CallOptions, ClientConfig, HttpTransport, RpcTransport, TaskLifecycleClient,
};
use agentwire_core::{AgentDescriptor, AgentwireError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Responds with `result`, echoing the request id.
fn echo_result(result: Value) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |req: &Request| {
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": result,
        }))
    }
}

fn transport() -> HttpTransport {
    HttpTransport::new(&ClientConfig::default()).unwrap()
}

fn endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).unwrap()
}

// ---------------------------------------------------------------------------
// RpcTransport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_call_returns_result_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": "message/send"})))
        .respond_with(echo_result(json!({"kind": "message", "parts": []})))
        .expect(1)
        .mount(&server)
        .await;

    let value = transport()
        .call(
            &endpoint(&server),
            "message/send",
            json!({"message": {"parts": []}}),
            &CallOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(value["kind"], "message");
}

#[tokio::test]
async fn test_error_envelope_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": {"code": -32601, "message": "Method not found"},
            }))
        })
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "tasks/list", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    match err {
        AgentwireError::Protocol { code, message } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_500_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    match &err {
        AgentwireError::Transport(msg) => {
            assert!(msg.contains("500"), "{msg}");
            assert!(msg.contains("upstream exploded"), "{msg}");
        }
        other => panic!("expected Transport, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let err = transport()
        .call(&url, "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentwireError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn test_mismatched_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "someone-else",
            "result": {"kind": "message", "parts": []},
        })))
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentwireError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_success_without_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": null,
            "result": {"kind": "message", "parts": []},
        })))
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentwireError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn test_error_with_null_id_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": -32700, "message": "Parse error"},
        })))
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, AgentwireError::Protocol { code: -32700, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .mount(&server)
        .await;

    let err = transport()
        .call(&endpoint(&server), "message/send", json!({}), &CallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentwireError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_per_call_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "result": {"kind": "message", "parts": []},
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = transport()
        .call(
            &endpoint(&server),
            "message/send",
            json!({}),
            &CallOptions::with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
    match err {
        AgentwireError::Transport(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected Transport, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// TaskLifecycleClient over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_client_polls_mocked_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "message/send"})))
        .respond_with(echo_result(json!({
            "kind": "task",
            "id": "task-42",
            "status": {"state": "submitted"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tasks/get", "params": {"id": "task-42"}})))
        .respond_with(move |req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let result = if n < 2 {
                json!({"kind": "task", "id": "task-42", "status": {"state": "working"}})
            } else {
                json!({
                    "kind": "task",
                    "id": "task-42",
                    "status": {"state": "completed"},
                    "artifacts": [{"parts": [{"kind": "text", "text": "X has three properties"}]}],
                })
            };
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        })
        .mount(&server)
        .await;

    let config = ClientConfig::default().with_poll_interval(Duration::from_millis(20));
    let client = TaskLifecycleClient::http(config).unwrap();
    let agent = AgentDescriptor::new("research", &format!("{}/", server.uri()), "1.0").unwrap();

    let outcome = client
        .run(&agent, "Summarize X", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome.output, "X has three properties");
    assert_eq!(outcome.task.unwrap().poll_count, 3);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}
