//! Minimal in-process agent server.
//!
//! Wraps an [`AgentCompute`] function in the wire protocol so that clients can
//! be exercised end to end, either answering immediately or through a polled
//! task.

use crate::protocol::{
    codes, input_text, RpcResponse, JSONRPC_VERSION, METHOD_CANCEL_TASK, METHOD_GET_TASK,
    METHOD_SEND_MESSAGE,
};
use crate::resolver::WELL_KNOWN_CARD_PATH;
use crate::task::TaskState;
use agentwire_core::AgentDescriptor;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Failure reported by an agent's computation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ComputeError(pub String);

impl ComputeError {
    /// Creates a new instance.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The function an agent runs to turn input text into output text.
#[async_trait]
pub trait AgentCompute: Send + Sync {
    /// Produces the answer for `input`.
    async fn compute(&self, input: &str) -> Result<String, ComputeError>;
}

/// How `message/send` is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Compute inline and return a `kind = message` result.
    Immediate,
    /// Spawn the computation and return a task handle to poll.
    Task,
}

/// Finished tasks nobody collected are dropped after this long.
const TASK_RETENTION: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct ServedTask {
    state: TaskState,
    output: Option<String>,
    error: Option<String>,
    finished_at: Option<Instant>,
}

struct ServerState {
    descriptor: AgentDescriptor,
    compute: Arc<dyn AgentCompute>,
    mode: ResponseMode,
    tasks: RwLock<HashMap<String, ServedTask>>,
}

/// Builds agent servers.
pub struct AgentServer;

impl AgentServer {
    /// Router serving the descriptor document and the RPC endpoint at `/`.
    pub fn router(
        descriptor: AgentDescriptor,
        compute: Arc<dyn AgentCompute>,
        mode: ResponseMode,
    ) -> Router {
        let state = Arc::new(ServerState {
            descriptor,
            compute,
            mode,
            tasks: RwLock::new(HashMap::new()),
        });

        Router::new()
            .route(&format!("/{WELL_KNOWN_CARD_PATH}"), get(card_handler))
            .route("/", post(rpc_handler))
            .with_state(state)
    }
}

async fn card_handler(State(state): State<Arc<ServerState>>) -> Json<Value> {
    Json(state.descriptor.to_document())
}

async fn rpc_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> Json<Value> {
    let response = dispatch(&state, &body).await;
    Json(serde_json::to_value(response).unwrap_or(Value::Null))
}

async fn dispatch(state: &Arc<ServerState>, body: &[u8]) -> RpcResponse {
    let request: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            return RpcResponse::failure(Value::Null, codes::PARSE_ERROR, format!("Parse error: {e}"))
        }
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str);
    let version = request.get("jsonrpc").and_then(Value::as_str);
    let method = match (version, method) {
        (Some(JSONRPC_VERSION), Some(m)) => m,
        _ => return RpcResponse::failure(id, codes::INVALID_REQUEST, "Invalid Request"),
    };
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    debug!(agent = %state.descriptor.name, method = %method, "RPC request received");

    match method {
        METHOD_SEND_MESSAGE => send_message(state, id, &params).await,
        METHOD_GET_TASK => get_task(state, id, &params).await,
        METHOD_CANCEL_TASK => RpcResponse::failure(
            id,
            codes::UNSUPPORTED_OPERATION,
            "Task cancellation is not supported",
        ),
        other => {
            warn!(agent = %state.descriptor.name, method = %other, "Unknown RPC method");
            RpcResponse::failure(id, codes::METHOD_NOT_FOUND, format!("Method not found: {other}"))
        }
    }
}

async fn send_message(state: &Arc<ServerState>, id: Value, params: &Value) -> RpcResponse {
    let Some(input) = input_text(params) else {
        return RpcResponse::failure(id, codes::INVALID_PARAMS, "params.message.parts is required");
    };

    match state.mode {
        ResponseMode::Immediate => match state.compute.compute(&input).await {
            Ok(output) => RpcResponse::success(id, agent_message(&output)),
            Err(e) => RpcResponse::failure(id, codes::INTERNAL_ERROR, e.to_string()),
        },
        ResponseMode::Task => {
            let task_id = Uuid::new_v4().to_string();
            {
                let mut tasks = state.tasks.write().await;
                tasks.retain(|_, task| {
                    !matches!(task.finished_at, Some(at) if at.elapsed() >= TASK_RETENTION)
                });
                tasks.insert(
                    task_id.clone(),
                    ServedTask {
                        state: TaskState::Submitted,
                        output: None,
                        error: None,
                        finished_at: None,
                    },
                );
            }
            info!(agent = %state.descriptor.name, task_id = %task_id, "Task created");

            let worker = Arc::clone(state);
            let spawned_id = task_id.clone();
            tokio::spawn(async move {
                run_task(worker, spawned_id, input).await;
            });

            RpcResponse::success(
                id,
                json!({
                    "kind": "task",
                    "id": task_id,
                    "status": {"state": wire_state(TaskState::Submitted)},
                }),
            )
        }
    }
}

async fn run_task(state: Arc<ServerState>, task_id: String, input: String) {
    set_task(&state, &task_id, TaskState::Working, None, None).await;

    match state.compute.compute(&input).await {
        Ok(output) => {
            set_task(&state, &task_id, TaskState::Succeeded, Some(output), None).await;
            info!(agent = %state.descriptor.name, task_id = %task_id, "Task completed");
        }
        Err(e) => {
            warn!(agent = %state.descriptor.name, task_id = %task_id, error = %e, "Task failed");
            set_task(&state, &task_id, TaskState::Failed, None, Some(e.to_string())).await;
        }
    }
}

async fn set_task(
    state: &ServerState,
    task_id: &str,
    next: TaskState,
    output: Option<String>,
    error: Option<String>,
) {
    if let Some(task) = state.tasks.write().await.get_mut(task_id) {
        task.state = next;
        task.output = output;
        task.error = error;
        if next.is_terminal() {
            task.finished_at = Some(Instant::now());
        }
    }
}

async fn get_task(state: &ServerState, id: Value, params: &Value) -> RpcResponse {
    let Some(task_id) = params.get("id").and_then(Value::as_str) else {
        return RpcResponse::failure(id, codes::INVALID_PARAMS, "params.id is required");
    };

    let task = {
        let mut tasks = state.tasks.write().await;
        let Some(task) = tasks.get(task_id).cloned() else {
            return RpcResponse::failure(id, codes::TASK_NOT_FOUND, format!("Task not found: {task_id}"));
        };
        // A terminal state is delivered once.
        if task.state.is_terminal() {
            tasks.remove(task_id);
        }
        task
    };

    let mut status = json!({"state": wire_state(task.state)});
    if let Some(error) = &task.error {
        status["message"] = agent_message(error);
    }
    let mut result = json!({"kind": "task", "id": task_id, "status": status});
    if let Some(output) = &task.output {
        result["artifacts"] = json!([{
            "artifactId": Uuid::new_v4().to_string(),
            "parts": [{"kind": "text", "text": output}],
        }]);
    }
    RpcResponse::success(id, result)
}

fn agent_message(text: &str) -> Value {
    json!({
        "kind": "message",
        "role": "agent",
        "parts": [{"kind": "text", "text": text}],
        "messageId": Uuid::new_v4().to_string(),
    })
}

/// State names as A2A agents report them.
fn wire_state(state: TaskState) -> &'static str {
    match state {
        TaskState::Submitted => "submitted",
        TaskState::Working => "working",
        TaskState::Succeeded => "completed",
        TaskState::Failed => "failed",
    }
}
