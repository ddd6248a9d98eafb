//! Error types for each boundary, plus the codes they surface on the wire.

use serde::{Deserialize, Serialize};

/// Machine-readable error codes surfaced at the client boundary.
///
/// Serialized in `SCREAMING_SNAKE_CASE`, exactly as a client sees them in
/// `error.code`. Every error a session can hand back maps to one of these.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or unknown request.
    InvalidRequest,
    /// The named variable does not exist in the namespace.
    VariableNotFound,
    /// The variable's rendered value exceeds the inspection size bound.
    VariableTooLarge,
    /// Code raised an error during execution.
    ExecutionError,
    /// Code exceeded its execution timeout.
    ExecutionTimeout,
    /// Code could not be parsed.
    SyntaxError,
    /// The kernel has not attached yet.
    KernelNotReady,
    /// The kernel is gone and the session must be re-established.
    KernelDead,
    /// The kernel stayed busy beyond the read-path bound.
    KernelBusy,
    /// A decision was already recorded for this approval case.
    AlreadyDecided,
    /// The approval case expired before a decision arrived.
    ApprovalTimedOut,
    /// The approval case was rejected; nothing was executed.
    ApprovalRejected,
    /// The session closed while the request was in flight.
    SessionClosed,
    /// Anything that escaped the other classifications.
    UnknownError,
}

/// The error object carried in a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details (tracebacks, offending input, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl WireError {
    /// Create an error with no details.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Transport channel errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel is closed; nothing more can be sent or received.
    #[error("channel closed")]
    Closed,

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Catch-all. Include context.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Message broker errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// No response arrived within the per-request timeout window.
    /// Any response arriving later for the same id is discarded.
    #[error("request timed out")]
    Timeout,

    /// The session closed while the request was pending.
    #[error("session closed")]
    SessionClosed,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid input for the tool.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Tool execution was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// A kernel error propagated out of a kernel-backed tool.
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Approval lifecycle errors. None of these ever mutate sandbox state.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// A decision was already recorded for this case, or the case already
    /// reached a terminal state. The second decision has no effect.
    #[error("case already decided: {0}")]
    AlreadyDecided(String),

    /// No case with this id is pending.
    #[error("unknown case: {0}")]
    UnknownCase(String),

    /// The case expired before a decision arrived. No sandbox call was made.
    #[error("approval timed out: {0}")]
    TimedOut(String),

    /// The case was rejected. No sandbox call was made.
    #[error("approval rejected: {0}")]
    Rejected(String),

    /// The session closed while the case was awaiting a decision.
    #[error("session closed")]
    SessionClosed,
}

/// Execution sandbox errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The kernel has not attached yet.
    #[error("kernel not ready")]
    NotReady,

    /// The kernel is gone; the session must be re-established.
    #[error("kernel dead")]
    Dead,

    /// The kernel stayed busy beyond the read-path acquisition bound.
    #[error("kernel busy")]
    Busy,

    /// Code raised during execution. The message mirrors what the client
    /// sees; the full detail travels in the execution result.
    #[error("execution error: {0}")]
    Execution(String),

    /// Execution exceeded its timeout.
    #[error("execution timed out after {0}")]
    ExecutionTimeout(crate::time::DurationMs),

    /// The snippet could not be parsed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The named variable does not exist.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// The variable's rendered value exceeds the inspection size bound.
    #[error("variable too large: {name} ({size} bytes)")]
    VariableTooLarge {
        /// The variable name.
        name: String,
        /// Rendered size in bytes.
        size: usize,
    },
}

impl KernelError {
    /// The wire code this error surfaces as.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotReady => ErrorCode::KernelNotReady,
            Self::Dead => ErrorCode::KernelDead,
            Self::Busy => ErrorCode::KernelBusy,
            Self::Execution(_) => ErrorCode::ExecutionError,
            Self::ExecutionTimeout(_) => ErrorCode::ExecutionTimeout,
            Self::Syntax(_) => ErrorCode::SyntaxError,
            Self::VariableNotFound(_) => ErrorCode::VariableNotFound,
            Self::VariableTooLarge { .. } => ErrorCode::VariableTooLarge,
        }
    }
}

impl ApprovalError {
    /// The wire code this error surfaces as.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyDecided(_) => ErrorCode::AlreadyDecided,
            Self::UnknownCase(_) => ErrorCode::InvalidRequest,
            Self::TimedOut(_) => ErrorCode::ApprovalTimedOut,
            Self::Rejected(_) => ErrorCode::ApprovalRejected,
            Self::SessionClosed => ErrorCode::SessionClosed,
        }
    }
}
