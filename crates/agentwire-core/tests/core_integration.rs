//! Integration tests for the core error and descriptor types.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use agentwire_core::*;

// ---------------------------------------------------------------------------
// 1. Descriptor serialization keeps the endpoint valid
// ---------------------------------------------------------------------------

#[test]
fn descriptor_serde_roundtrip_preserves_endpoint() {
    let desc = AgentDescriptor::new("research", "http://127.0.0.1:9001/", "1.2.0")
        .unwrap()
        .with_capability("summarize")
        .with_capability("search");

    let json = serde_json::to_string(&desc).unwrap();
    let parsed: AgentDescriptor = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, desc);
    assert_eq!(parsed.endpoint.scheme(), "http");
    assert_eq!(parsed.endpoint.port(), Some(9001));
}

// ---------------------------------------------------------------------------
// 2. Every error category maps to a distinct ErrorInfo kind
// ---------------------------------------------------------------------------

#[test]
fn error_kinds_are_distinct() {
    let errors = vec![
        AgentwireError::NotFound("a".into()),
        AgentwireError::Unavailable("b".into()),
        AgentwireError::MalformedDescriptor("c".into()),
        AgentwireError::Transport("d".into()),
        AgentwireError::Protocol {
            code: 1,
            message: "e".into(),
        },
        AgentwireError::MalformedResponse("f".into()),
        AgentwireError::Timeout { task_id: None },
        AgentwireError::TaskFailed {
            task_id: "t".into(),
            detail: "g".into(),
        },
        AgentwireError::Unsupported("h".into()),
        AgentwireError::Config("i".into()),
    ];

    let mut kinds: Vec<String> = errors.iter().map(|e| ErrorInfo::from(e).kind).collect();
    let total = kinds.len();
    kinds.sort();
    kinds.dedup();
    assert_eq!(kinds.len(), total);
}

// ---------------------------------------------------------------------------
// 3. ErrorInfo survives serialization for result reports
// ---------------------------------------------------------------------------

#[test]
fn error_info_serialization() {
    let info = ErrorInfo::from(AgentwireError::TaskFailed {
        task_id: "task-7".into(),
        detail: "model unavailable".into(),
    });
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["kind"], "task_failed");
    assert_eq!(json["message"], "Task task-7 failed: model unavailable");

    let back: ErrorInfo = serde_json::from_value(json).unwrap();
    assert_eq!(back, info);
}
