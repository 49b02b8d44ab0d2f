use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A convenience `Result` alias using [`AgentwireError`].
pub type AgentwireResult<T> = Result<T, AgentwireError>;

/// Top-level error type for agentwire.
///
/// Transport failures and protocol failures are kept in separate variants so
/// that callers can tell a retryable network problem apart from an explicit
/// rejection by the remote agent.
#[derive(Error, Debug)]
pub enum AgentwireError {
    /// The registry does not know the requested agent.
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// The registry or well-known location could not be reached.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    /// A descriptor document failed schema validation.
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Non-2xx HTTP status, refused connection or read timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A well-formed response envelope carrying an `error` object.
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// JSON-RPC error code reported by the agent.
        code: i64,
        /// Human-readable message reported by the agent.
        message: String,
    },

    /// A response that violates the wire schema.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The local deadline passed while the remote task may still be running.
    #[error("Timed out waiting for task {}", display_task_id(.task_id))]
    Timeout {
        /// The remote task id, if one had been assigned before the deadline.
        task_id: Option<String>,
    },

    /// The remote task reached the `Failed` state.
    #[error("Task {task_id} failed: {detail}")]
    TaskFailed {
        /// The remote task id.
        task_id: String,
        /// Failure detail reported by the agent.
        detail: String,
    },

    /// The requested operation is not supported by this client.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_task_id(task_id: &Option<String>) -> &str {
    task_id.as_deref().unwrap_or("<unassigned>")
}

impl AgentwireError {
    /// Whether repeating the same logical call may succeed.
    ///
    /// Only network-level failures qualify. Protocol errors and failed tasks
    /// are explicit answers from the remote side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable(_))
    }

    /// Stable snake_case tag naming the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::MalformedDescriptor(_) => "malformed_descriptor",
            Self::Transport(_) => "transport",
            Self::Protocol { .. } => "protocol",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout { .. } => "timeout",
            Self::TaskFailed { .. } => "task_failed",
            Self::Unsupported(_) => "unsupported",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }
}

/// Serializable capture of an [`AgentwireError`].
///
/// Stored in per-item result slots so that a fan-out report can be cloned,
/// logged or serialized after the original error has been consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Category tag, see [`AgentwireError::kind`].
    pub kind: String,
    /// Rendered error message.
    pub message: String,
}

impl ErrorInfo {
    /// Creates an error capture from raw parts.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&AgentwireError> for ErrorInfo {
    fn from(err: &AgentwireError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<AgentwireError> for ErrorInfo {
    fn from(err: AgentwireError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
