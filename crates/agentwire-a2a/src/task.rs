use crate::protocol::TaskGetResponse;
use agentwire_core::{AgentwireError, AgentwireResult, ErrorInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a remote task.
///
/// `Submitted → Working → {Succeeded, Failed}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Accepted by the agent, not started yet.
    Submitted,
    /// Being computed.
    Working,
    /// Finished with output.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl TaskState {
    /// Whether no further transition may leave this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            TaskState::Submitted => 0,
            TaskState::Working => 1,
            TaskState::Succeeded | TaskState::Failed => 2,
        }
    }

    /// Whether an observed move from `self` to `next` is legal.
    ///
    /// Polls sample the remote state, so a task may appear to skip `Working`.
    /// Staying in place is legal for non-terminal states; moving backwards or
    /// leaving a terminal state is not.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::Succeeded => write!(f, "succeeded"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Client-side record of one remote task, owned by the polling loop that
/// created it and dropped once its result has been handed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Remote task id.
    pub task_id: String,
    /// Current state.
    pub state: TaskState,
    /// When the task handle was received.
    pub created_at: DateTime<Utc>,
    /// When the task was last polled.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Polls applied so far.
    pub poll_count: u32,
    /// Success payload.
    pub result: Option<String>,
    /// Error payload.
    pub error: Option<ErrorInfo>,
}

impl TaskRecord {
    /// Creates a record in the `Submitted` state.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Submitted,
            created_at: Utc::now(),
            last_polled_at: None,
            poll_count: 0,
            result: None,
            error: None,
        }
    }

    /// Whether the record reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Moves to `next`, rejecting illegal transitions as a protocol violation.
    pub fn transition(&mut self, next: TaskState) -> AgentwireResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AgentwireError::MalformedResponse(format!(
                "task {} reported illegal transition {} -> {}",
                self.task_id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Applies one `tasks/get` observation.
    pub fn apply(&mut self, update: &TaskGetResponse) -> AgentwireResult<()> {
        if let Some(id) = &update.task_id {
            if id != &self.task_id {
                return Err(AgentwireError::MalformedResponse(format!(
                    "polled task {} but response describes task {}",
                    self.task_id, id
                )));
            }
        }

        self.last_polled_at = Some(Utc::now());
        self.poll_count += 1;
        self.transition(update.state)?;

        match self.state {
            TaskState::Succeeded => self.result = update.result.clone(),
            TaskState::Failed => {
                let detail = update
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "no detail reported".to_string());
                self.error = Some(ErrorInfo::new("task_failed", detail));
            }
            TaskState::Submitted | TaskState::Working => {}
        }
        Ok(())
    }
}
