use agentwire_core::{AgentDescriptor, AgentwireError, ErrorInfo};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Outcome stored in one result slot.
pub type ItemResult = Result<String, ErrorInfo>;

/// One unit of work: some text for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Identifies the item in logs and progress events. Wire correlation ids
    /// are generated per attempt by the transport.
    pub request_id: Uuid,
    /// Agent name.
    pub agent: AgentDescriptor,
    /// Input text.
    pub input: String,
}

impl TaskRequest {
    /// Creates a new instance.
    pub fn new(agent: AgentDescriptor, input: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            agent,
            input: input.into(),
        }
    }
}

/// How the items of a job are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One item at a time, in input order.
    Sequential,
    /// All items at once.
    ConcurrentFanOut,
    /// Batches of at most `max_concurrent`, with a pause between batches.
    BoundedBatch {
        /// Batch size.
        max_concurrent: usize,
        /// Pause after each batch except the last.
        inter_batch_delay: Duration,
    },
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::ConcurrentFanOut => write!(f, "fan-out"),
            Strategy::BoundedBatch {
                max_concurrent,
                inter_batch_delay,
            } => write!(
                f,
                "batch(max={max_concurrent}, delay={}ms)",
                inter_batch_delay.as_millis()
            ),
        }
    }
}

/// Ordered items plus the strategy used to run them.
#[derive(Debug, Clone)]
pub struct OrchestrationJob {
    /// Items in input order.
    pub items: Vec<TaskRequest>,
    /// Scheduling strategy.
    pub strategy: Strategy,
}

impl OrchestrationJob {
    /// Creates a new instance.
    pub fn new(items: Vec<TaskRequest>, strategy: Strategy) -> Self {
        Self { items, strategy }
    }

    /// Sends every input to the same agent.
    pub fn for_agent<I, S>(agent: &AgentDescriptor, inputs: I, strategy: Strategy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = inputs
            .into_iter()
            .map(|input| TaskRequest::new(agent.clone(), input))
            .collect();
        Self { items, strategy }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the job has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Aggregate of a finished job. `results[i]` belongs to `items[i]`.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// One slot per item, in input order.
    pub results: Vec<ItemResult>,
    /// Calls that succeeded.
    pub succeeded: usize,
    /// Calls that failed.
    pub failed: usize,
    /// Wall-clock time for the whole job.
    pub elapsed: Duration,
}

impl JobReport {
    /// Counts successes and failures in `results`.
    pub fn new(results: Vec<ItemResult>, elapsed: Duration) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
            elapsed,
        }
    }

    /// Number of result slots.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Whether no item failed.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Successful outputs in input order, skipping failures.
    pub fn outputs(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(String::as_str))
            .collect()
    }

    /// One-line summary such as `2/3 succeeded, 1 failed in 1.50s`.
    pub fn summary(&self) -> String {
        format!(
            "{}/{} succeeded, {} failed in {:.2}s",
            self.succeeded,
            self.total(),
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Per-completion notification. Sent in completion order.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Position of the item in the job.
    pub index: usize,
    /// Id of the item.
    pub request_id: Uuid,
    /// Agent name.
    pub agent: String,
    /// Success payload.
    pub result: ItemResult,
    /// Items finished so far, including this one.
    pub completed: usize,
    /// Items in the job.
    pub total: usize,
}

/// One executed stage of a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// Agent name.
    pub agent: String,
    /// Text the stage received.
    pub input: String,
    /// Output text.
    pub output: String,
}

/// Successful chain run with every intermediate value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOutcome {
    /// Input of the first stage.
    pub input: String,
    /// Executed stages in order.
    pub stages: Vec<StageOutput>,
}

impl ChainOutcome {
    /// Output of the last stage; the original input for an empty chain.
    pub fn output(&self) -> &str {
        self.stages
            .last()
            .map(|s| s.output.as_str())
            .unwrap_or(&self.input)
    }

    /// Output of stage `index`.
    pub fn intermediate(&self, index: usize) -> Option<&str> {
        self.stages.get(index).map(|s| s.output.as_str())
    }
}

/// A chain stopped at the first failing stage.
#[derive(Debug, thiserror::Error)]
#[error("stage {stage_index} ({agent}) failed: {source}")]
pub struct ChainError {
    /// Zero-based position of the failing stage.
    pub stage_index: usize,
    /// Name of the failing agent.
    pub agent: String,
    /// Error raised by the stage.
    #[source]
    pub source: AgentwireError,
    /// Stages that completed before the failure.
    pub completed: Vec<StageOutput>,
}

impl From<&ChainError> for ErrorInfo {
    fn from(err: &ChainError) -> Self {
        ErrorInfo::new(err.source.kind(), err.to_string())
    }
}
