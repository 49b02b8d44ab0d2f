use agentwire_a2a::AgentCaller;
use agentwire_core::{AgentDescriptor, AgentwireResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Retry behaviour for a single agent call.
///
/// Only retryable errors (transport failures, unavailable services) are
/// retried. Every attempt is a new request with a fresh correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    #[serde(default)]
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl RetryPolicy {
    /// Creates a new instance.
    pub fn new(max_retries: u32, backoff_base_ms: u64, backoff_max_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            backoff_max_ms,
        }
    }

    /// Delay before retry number `attempt + 1`, capped at `backoff_max_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.backoff_max_ms))
    }
}

/// Calls `agent` through `caller`, retrying retryable failures per `policy`.
pub async fn call_with_retry(
    caller: &dyn AgentCaller,
    policy: &RetryPolicy,
    agent: &AgentDescriptor,
    input: &str,
) -> AgentwireResult<String> {
    let mut attempt = 0;
    loop {
        match caller.call(agent, input).await {
            Ok(output) => return Ok(output),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                info!(
                    agent = %agent.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!(agent = %agent.name, attempts = attempt + 1, error = %e, "Giving up on agent call");
                }
                return Err(e);
            }
        }
    }
}
