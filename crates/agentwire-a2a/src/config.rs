use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and polling cadence for agent RPC clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Time allowed to establish a TCP/TLS connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound for a single HTTP round trip, including slow generation.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay between two `tasks/get` polls of the same task.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Overall deadline for one submit-and-await call.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    /// Timeout for descriptor document fetches.
    #[serde(default = "default_card_timeout_secs")]
    pub card_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    360
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_task_timeout_secs() -> u64 {
    300
}

fn default_card_timeout_secs() -> u64 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            task_timeout_secs: default_task_timeout_secs(),
            card_timeout_secs: default_card_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall task deadline as a [`Duration`].
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Descriptor fetch timeout as a [`Duration`].
    pub fn card_timeout(&self) -> Duration {
        Duration::from_secs(self.card_timeout_secs)
    }

    /// Builder-style override of the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder-style override of the overall task deadline.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_secs = timeout.as_secs();
        self
    }
}
