//! Composition of agent calls: chains, fan-out, bounded batches and
//! progress streaming.
//!
//! # Main types
//!
//! - [`Orchestrator`] runs every strategy on top of an [`AgentCaller`](agentwire_a2a::AgentCaller).
//! - [`OrchestrationJob`] is an ordered list of [`TaskRequest`]s plus a [`Strategy`].
//! - [`JobReport`] holds one result per item, index-aligned with the job.
//! - [`AgentMonitor`] tracks in-flight calls and per-agent outcomes.
//! - [`RetryPolicy`] retries transport-level failures with exponential backoff.

/// Orchestrator configuration.
pub mod config;
/// Orchestration engine.
pub mod engine;
/// In-flight and per-agent call tracking.
pub mod monitor;
/// Retry policy for single agent calls.
pub mod retry;
/// Jobs, strategies, reports and chain results.
pub mod types;

pub use config::OrchestratorConfig;
pub use engine::{perspective_prompt, Orchestrator};
pub use monitor::{AgentMonitor, AgentStats, CallGuard};
pub use retry::{call_with_retry, RetryPolicy};
pub use types::{
    ChainError, ChainOutcome, ItemResult, JobReport, OrchestrationJob, ProgressEvent, StageOutput,
    Strategy, TaskRequest,
};
