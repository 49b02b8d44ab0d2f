use agentwire_core::ErrorInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Call counters for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Agent name.
    pub agent: String,
    /// Calls currently running.
    pub in_flight: usize,
    /// Calls started.
    pub started: u64,
    /// Calls that succeeded.
    pub succeeded: u64,
    /// Calls that failed.
    pub failed: u64,
    /// Calls abandoned before they finished, e.g. by an outer timeout.
    pub cancelled: u64,
    /// Total time spent in finished calls.
    pub duration_ms: u64,
    /// Most recent failure.
    pub last_error: Option<ErrorInfo>,
}

#[derive(Default)]
struct MonitorState {
    agents: HashMap<String, AgentStats>,
    in_flight: usize,
    peak_in_flight: usize,
}

enum Finish {
    Succeeded,
    Failed(ErrorInfo),
    Cancelled,
}

/// Tracks in-flight calls and per-agent outcomes across an orchestrator.
///
/// The lock is never held across an await point.
#[derive(Clone, Default)]
pub struct AgentMonitor {
    state: Arc<Mutex<MonitorState>>,
}

/// An in-flight call. Dropping it without [`finish`](Self::finish) records
/// the call as cancelled.
#[must_use = "dropping the guard immediately records the call as cancelled"]
pub struct CallGuard {
    monitor: AgentMonitor,
    agent: String,
    started: Instant,
    finished: bool,
}

impl CallGuard {
    /// Records the outcome of the call.
    pub fn finish(mut self, outcome: Result<(), ErrorInfo>) {
        self.finished = true;
        let finish = match outcome {
            Ok(()) => Finish::Succeeded,
            Err(e) => Finish::Failed(e),
        };
        self.monitor.record_finish(&self.agent, finish, self.elapsed_ms());
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.monitor
                .record_finish(&self.agent, Finish::Cancelled, self.elapsed_ms());
        }
    }
}

impl AgentMonitor {
    /// Empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a call to `agent` as started. The call stays in flight until the
    /// returned guard is finished or dropped.
    pub fn start_call(&self, agent: &str) -> CallGuard {
        {
            let mut state = self.lock();
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            let stats = state
                .agents
                .entry(agent.to_string())
                .or_insert_with(|| AgentStats {
                    agent: agent.to_string(),
                    ..AgentStats::default()
                });
            stats.in_flight += 1;
            stats.started += 1;
        }
        CallGuard {
            monitor: self.clone(),
            agent: agent.to_string(),
            started: Instant::now(),
            finished: false,
        }
    }

    fn record_finish(&self, agent: &str, finish: Finish, duration_ms: u64) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if let Some(stats) = state.agents.get_mut(agent) {
            stats.in_flight = stats.in_flight.saturating_sub(1);
            stats.duration_ms += duration_ms;
            match finish {
                Finish::Succeeded => stats.succeeded += 1,
                Finish::Failed(e) => {
                    stats.failed += 1;
                    stats.last_error = Some(e);
                }
                Finish::Cancelled => stats.cancelled += 1,
            }
        }
    }

    /// Calls currently in flight across all agents.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Highest in-flight count observed since creation or the last reset.
    pub fn peak_in_flight(&self) -> usize {
        self.lock().peak_in_flight
    }

    /// Restarts peak tracking from the current in-flight count.
    pub fn reset_peak(&self) {
        let mut state = self.lock();
        state.peak_in_flight = state.in_flight;
    }

    /// Stats for one agent, if it was ever called.
    pub fn get_stats(&self, agent: &str) -> Option<AgentStats> {
        self.lock().agents.get(agent).cloned()
    }

    /// Stats for every agent seen, sorted by name.
    pub fn snapshot(&self) -> Vec<AgentStats> {
        let mut stats: Vec<AgentStats> = self.lock().agents.values().cloned().collect();
        stats.sort_by(|a, b| a.agent.cmp(&b.agent));
        stats
    }

    /// Serialize the current state as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let agents = self.snapshot();
        let (in_flight, peak) = {
            let state = self.lock();
            (state.in_flight, state.peak_in_flight)
        };
        serde_json::json!({
            "in_flight": in_flight,
            "peak_in_flight": peak,
            "agents": agents,
        })
    }
}
