//! Task-lifecycle client: submits a message to an agent and follows the
//! resulting task until it reaches a terminal state or the deadline passes.

use crate::config::ClientConfig;
use crate::protocol::{
    get_task_params, parse_send_result, send_message_params, SendResult, TaskGetResponse,
    METHOD_GET_TASK, METHOD_SEND_MESSAGE,
};
use crate::task::{TaskRecord, TaskState};
use crate::transport::{CallOptions, HttpTransport, RpcTransport};
use agentwire_core::{AgentDescriptor, AgentwireError, AgentwireResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// One unit of orchestrated work: send text to an agent, get text back.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    /// Sends `input` to `agent` and returns its answer.
    async fn call(&self, agent: &AgentDescriptor, input: &str) -> AgentwireResult<String>;
}

/// Output of a completed call.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Final text produced by the agent.
    pub output: String,
    /// The polled task, or `None` when the agent answered immediately.
    pub task: Option<TaskRecord>,
}

/// Implements the submit-then-poll state machine over an [`RpcTransport`].
pub struct TaskLifecycleClient {
    transport: Arc<dyn RpcTransport>,
    config: ClientConfig,
}

impl TaskLifecycleClient {
    /// Client over any transport.
    pub fn new(transport: Arc<dyn RpcTransport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client over [`HttpTransport`].
    pub fn http(config: ClientConfig) -> AgentwireResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `input` to `agent` and waits at most `timeout` for the answer.
    pub async fn submit_and_await(
        &self,
        agent: &AgentDescriptor,
        input: &str,
        timeout: Duration,
    ) -> AgentwireResult<String> {
        self.run(agent, input, timeout).await.map(|o| o.output)
    }

    /// Like [`submit_and_await`](Self::submit_and_await), also returning the task record.
    pub async fn run(
        &self,
        agent: &AgentDescriptor,
        input: &str,
        timeout: Duration,
    ) -> AgentwireResult<TaskOutcome> {
        let deadline = deadline_after(timeout);

        let result = self
            .call_before(
                deadline,
                &agent.endpoint,
                METHOD_SEND_MESSAGE,
                send_message_params(input),
                None,
            )
            .await?;

        match parse_send_result(&result)? {
            SendResult::Message(output) => {
                debug!(agent = %agent.name, "Agent answered immediately");
                Ok(TaskOutcome { output, task: None })
            }
            SendResult::Task { task_id } => {
                info!(agent = %agent.name, task_id = %task_id, "Agent created task, polling");
                let record = TaskRecord::new(task_id);
                self.poll(agent, record, deadline).await
            }
        }
    }

    /// Polls until terminal. Polls for one task are strictly sequential.
    async fn poll(
        &self,
        agent: &AgentDescriptor,
        mut record: TaskRecord,
        deadline: Instant,
    ) -> AgentwireResult<TaskOutcome> {
        loop {
            let raw = self
                .call_before(
                    deadline,
                    &agent.endpoint,
                    METHOD_GET_TASK,
                    get_task_params(&record.task_id),
                    Some(&record.task_id),
                )
                .await?;
            let update = TaskGetResponse::parse(&raw)?;
            record.apply(&update)?;

            debug!(
                agent = %agent.name,
                task_id = %record.task_id,
                state = %record.state,
                polls = record.poll_count,
                "Task polled"
            );

            match record.state {
                TaskState::Succeeded => {
                    let output = match record.result.clone() {
                        Some(output) => output,
                        None => {
                            warn!(task_id = %record.task_id, "Task succeeded without output");
                            String::new()
                        }
                    };
                    info!(agent = %agent.name, task_id = %record.task_id, "Task succeeded");
                    return Ok(TaskOutcome {
                        output,
                        task: Some(record),
                    });
                }
                TaskState::Failed => {
                    let detail = record
                        .error
                        .as_ref()
                        .map(|e| e.message.clone())
                        .unwrap_or_default();
                    warn!(agent = %agent.name, task_id = %record.task_id, detail = %detail, "Task failed");
                    return Err(AgentwireError::TaskFailed {
                        task_id: record.task_id,
                        detail,
                    });
                }
                TaskState::Submitted | TaskState::Working => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out(&record));
            }
            tokio::time::sleep(self.config.poll_interval().min(remaining)).await;
            if Instant::now() >= deadline {
                return Err(timed_out(&record));
            }
        }
    }

    /// One transport call bounded by the overall deadline.
    async fn call_before(
        &self,
        deadline: Instant,
        endpoint: &Url,
        method: &str,
        params: serde_json::Value,
        task_id: Option<&str>,
    ) -> AgentwireResult<serde_json::Value> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let timeout = || AgentwireError::Timeout {
            task_id: task_id.map(str::to_string),
        };
        if remaining.is_zero() {
            return Err(timeout());
        }

        let options = CallOptions::default();
        tokio::time::timeout(
            remaining,
            self.transport.call(endpoint, method, params, &options),
        )
        .await
        .map_err(|_| timeout())?
    }

    /// Remote cancellation is not implemented by agents; this always fails.
    ///
    /// The remote task keeps running after a local timeout.
    pub async fn cancel(&self, agent: &AgentDescriptor, task_id: &str) -> AgentwireResult<()> {
        Err(AgentwireError::Unsupported(format!(
            "cancelling task {task_id} on agent '{}' is not supported",
            agent.name
        )))
    }
}

/// Roughly 30 years; larger timeouts are clamped to this.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(FAR_FUTURE)).unwrap_or(now)
}

fn timed_out(record: &TaskRecord) -> AgentwireError {
    warn!(
        task_id = %record.task_id,
        state = %record.state,
        polls = record.poll_count,
        "Gave up waiting for task; remote task left running"
    );
    AgentwireError::Timeout {
        task_id: Some(record.task_id.clone()),
    }
}

#[async_trait]
impl AgentCaller for TaskLifecycleClient {
    async fn call(&self, agent: &AgentDescriptor, input: &str) -> AgentwireResult<String> {
        self.submit_and_await(agent, input, self.config.task_timeout())
            .await
    }
}
