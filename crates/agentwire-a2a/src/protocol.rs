//! A2A JSON-RPC 2.0 message types and result-shape normalisation.

use crate::task::TaskState;
use agentwire_core::{AgentwireError, AgentwireResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Protocol version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Submit a message to an agent.
pub const METHOD_SEND_MESSAGE: &str = "message/send";
/// Query the state of a previously submitted task.
pub const METHOD_GET_TASK: &str = "tasks/get";
/// Ask an agent to cancel a task. Recognised by the server only to reject it.
pub const METHOD_CANCEL_TASK: &str = "tasks/cancel";

/// Standard and A2A-specific error codes.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error, including a failed computation.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// The referenced task does not exist.
    pub const TASK_NOT_FOUND: i64 = -32001;
    /// The operation is not supported by the agent.
    pub const UNSUPPORTED_OPERATION: i64 = -32004;
}

/// Request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`.
    #[serde(rename = "jsonrpc")]
    pub protocol_version: String,
    /// Fresh per call; never reused across retries.
    #[serde(rename = "id")]
    pub correlation_id: Uuid,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Request with a fresh correlation id.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            protocol_version: JSONRPC_VERSION.to_string(),
            correlation_id: Uuid::new_v4(),
            method: method.into(),
            params,
        }
    }
}

/// Response envelope. Exactly one of `result` or `error` is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version tag.
    #[serde(rename = "jsonrpc", default)]
    pub protocol_version: Option<String>,
    /// Echo of the request id.
    #[serde(rename = "id", default)]
    pub correlation_id: Option<Value>,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

/// Error object of a response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Extra error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// Successful response keyed by `id`.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            protocol_version: Some(JSONRPC_VERSION.to_string()),
            correlation_id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error response keyed by `id`.
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            protocol_version: Some(JSONRPC_VERSION.to_string()),
            correlation_id: Some(id),
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Rejects a response keyed by a different correlation id.
    ///
    /// A missing or null id is tolerated only on error envelopes, where the
    /// agent may not have been able to read the request id.
    pub fn check_correlation(&self, expected: &Uuid) -> AgentwireResult<()> {
        match &self.correlation_id {
            None | Some(Value::Null) if self.error.is_some() && self.result.is_none() => Ok(()),
            None | Some(Value::Null) => Err(AgentwireError::MalformedResponse(format!(
                "success response does not echo request id {expected}"
            ))),
            Some(Value::String(id)) if id == &expected.to_string() => Ok(()),
            Some(other) => Err(AgentwireError::MalformedResponse(format!(
                "response id {other} does not match request id {expected}"
            ))),
        }
    }

    /// Splits the envelope into its two failure channels.
    pub fn into_result(self) -> AgentwireResult<Value> {
        match (self.result, self.error) {
            (Some(result), None) => Ok(result),
            (None, Some(err)) => Err(AgentwireError::Protocol {
                code: err.code,
                message: err.message,
            }),
            (Some(_), Some(_)) => Err(AgentwireError::MalformedResponse(
                "response carries both 'result' and 'error'".into(),
            )),
            (None, None) => Err(AgentwireError::MalformedResponse(
                "response carries neither 'result' nor 'error'".into(),
            )),
        }
    }
}

/// Builds `message/send` params for a single user text part.
///
/// Empty text is forwarded as-is; the agent decides what it means.
pub fn send_message_params(text: &str) -> Value {
    serde_json::json!({
        "message": {
            "kind": "message",
            "role": "user",
            "parts": [{"kind": "text", "text": text}],
            "messageId": Uuid::new_v4().to_string(),
        }
    })
}

/// Builds `tasks/get` params.
pub fn get_task_params(task_id: &str) -> Value {
    serde_json::json!({ "id": task_id })
}

/// Extracts the user text from `message/send` params.
///
/// Accepts the A2A `message.parts` shape and a bare `{ "input": ... }`.
pub fn input_text(params: &Value) -> Option<String> {
    if let Some(input) = params.get("input").and_then(Value::as_str) {
        return Some(input.to_string());
    }
    let message = params.get("message")?;
    message.get("parts")?.as_array()?;
    Some(parts_text(message))
}

/// Joins the text parts of a message-like object with newlines.
pub fn parts_text(message: &Value) -> String {
    message
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| {
                    let kind = p.get("kind").or_else(|| p.get("type"));
                    kind.and_then(Value::as_str) == Some("text")
                })
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Shape of a `message/send` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    /// Direct answer; no task was created.
    Message(String),
    /// Handle of a task that must be polled.
    Task {
        /// Remote task id.
        task_id: String,
    },
}

/// Classifies a `message/send` result.
///
/// `kind = message` is an immediate answer. Anything else that carries a task
/// id needs polling, whatever its declared kind or initial status.
pub fn parse_send_result(result: &Value) -> AgentwireResult<SendResult> {
    let obj = result.as_object().ok_or_else(|| {
        AgentwireError::MalformedResponse(format!("message/send result is not an object: {result}"))
    })?;

    if obj.get("kind").and_then(Value::as_str) == Some("message") {
        if let Some(parts) = obj.get("parts") {
            if !parts.is_array() {
                return Err(AgentwireError::MalformedResponse(
                    "message 'parts' is not an array".into(),
                ));
            }
        }
        return Ok(SendResult::Message(parts_text(result)));
    }

    let task_id = obj
        .get("taskId")
        .or_else(|| obj.get("id"))
        .and_then(Value::as_str);

    match task_id {
        Some(id) if !id.is_empty() => Ok(SendResult::Task {
            task_id: id.to_string(),
        }),
        _ => Err(AgentwireError::MalformedResponse(format!(
            "message/send result carries neither a message nor a task handle: {result}"
        ))),
    }
}

/// Normalised `tasks/get` result.
///
/// Every legacy shape observed from agents (`state` vs `status`, status as a
/// string or an object, output under `result`, `result.output`, `artifacts` or
/// the status message) is mapped here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGetResponse {
    /// Remote task id.
    pub task_id: Option<String>,
    /// Current state.
    pub state: TaskState,
    /// Output text, present once the task succeeded.
    pub result: Option<String>,
    /// Remote failure detail.
    pub error_detail: Option<String>,
}

impl TaskGetResponse {
    /// Parses a `tasks/get` result value.
    pub fn parse(value: &Value) -> AgentwireResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            AgentwireError::MalformedResponse(format!("tasks/get result is not an object: {value}"))
        })?;

        let task_id = obj
            .get("taskId")
            .or_else(|| obj.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let status_obj = obj.get("status").filter(|s| s.is_object());
        let raw_state = obj
            .get("state")
            .and_then(Value::as_str)
            .or_else(|| obj.get("status").and_then(Value::as_str))
            .or_else(|| status_obj.and_then(|s| s.get("state")).and_then(Value::as_str))
            .ok_or_else(|| {
                AgentwireError::MalformedResponse(format!("task response has no state: {value}"))
            })?;

        let (state, implied_detail) = parse_state(raw_state)?;
        let status_text = status_obj
            .and_then(|s| s.get("message"))
            .map(parts_text)
            .filter(|t| !t.is_empty());

        let result = if state == TaskState::Succeeded {
            obj.get("result")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    obj.get("result")
                        .and_then(|r| r.get("output"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .or_else(|| obj.get("output").and_then(Value::as_str).map(str::to_string))
                .or_else(|| artifacts_text(obj.get("artifacts")))
                .or_else(|| status_text.clone())
        } else {
            None
        };

        let error_detail = if state == TaskState::Failed {
            obj.get("errorDetail")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| obj.get("error").and_then(Value::as_str).map(str::to_string))
                .or_else(|| {
                    obj.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .or(status_text)
                .or(implied_detail)
        } else {
            None
        };

        Ok(Self {
            task_id,
            state,
            result,
            error_detail,
        })
    }
}

fn parse_state(raw: &str) -> AgentwireResult<(TaskState, Option<String>)> {
    let normalized = raw.trim().to_lowercase().replace('_', "-");
    let parsed = match normalized.as_str() {
        "submitted" | "pending" => (TaskState::Submitted, None),
        "working" | "running" | "in-progress" => (TaskState::Working, None),
        "succeeded" | "completed" | "done" => (TaskState::Succeeded, None),
        "failed" | "error" | "canceled" | "cancelled" | "rejected" => (TaskState::Failed, None),
        "input-required" | "auth-required" => (
            TaskState::Failed,
            Some(format!("agent entered '{normalized}', which this client does not support")),
        ),
        _ => {
            return Err(AgentwireError::MalformedResponse(format!(
                "unknown task state '{raw}'"
            )))
        }
    };
    Ok(parsed)
}

fn artifacts_text(artifacts: Option<&Value>) -> Option<String> {
    let texts: Vec<String> = artifacts?
        .as_array()?
        .iter()
        .map(parts_text)
        .filter(|t| !t.is_empty())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}
