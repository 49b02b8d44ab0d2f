use crate::retry::RetryPolicy;
use crate::types::Strategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ceiling on in-flight calls for bounded batches.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Pause between two bounded batches.
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    /// Retry policy for each agent call.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Pause between batches.
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Bounded-batch strategy built from these settings.
    pub fn batch_strategy(&self) -> Strategy {
        Strategy::BoundedBatch {
            max_concurrent: self.max_concurrent,
            inter_batch_delay: self.inter_batch_delay(),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
