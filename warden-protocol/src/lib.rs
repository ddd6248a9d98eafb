//! # warden-protocol — wire protocol and shared data model
//!
//! This crate defines the one schema both sides of a warden session speak:
//! the message envelope, the recognized request and response payloads, the
//! out-of-band approval event, the error codes surfaced at the boundary,
//! and the [`Transport`] trait that carries it all.
//!
//! ## The boundaries
//!
//! | Boundary | Types | What it covers |
//! |----------|-------|----------------|
//! | Wire | [`WireEnvelope`], [`WirePayload`] | Message identity, ordering, correlation |
//! | Errors | [`ErrorCode`], [`WireError`] | Everything a client can observe going wrong |
//! | Execution | [`ExecutionResult`], [`OutputFragment`] | What one sandbox call produced |
//! | Inspection | [`ValueDescription`], [`KernelInfo`] | Read-only views of the namespace |
//! | Transport | [`Transport`] | Any ordered, at-most-once duplex pipe |
//!
//! ## Design principle
//!
//! The original system this replaces kept two parallel copies of these
//! definitions (one per side of the channel) and matched requests to
//! handlers by string name at call time. Here there is exactly one schema,
//! and the payload enum makes unknown message types a deserialization
//! outcome rather than a runtime lookup failure.
//!
//! Everything here is data plus one trait. Brokering, classification,
//! approval, and execution live in the crates above.

#![deny(missing_docs)]

pub mod envelope;
pub mod error;
pub mod execution;
pub mod id;
pub mod invocation;
pub mod time;
pub mod transport;
pub mod variables;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use envelope::{
    ApprovalDecision, ApprovalRequestEvent, DecideApprovalParams, DecisionAck, ExecuteCodeParams,
    GetHistoryParams, GetStackTraceParams, GetVariablesParams, HistoryData, HistoryEntry,
    InspectData, InspectVariableParams, ResponseBody, StackTraceData, VariablesData, WireEnvelope,
    WirePayload, PROTOCOL_VERSION,
};
pub use error::{
    ApprovalError, BrokerError, ErrorCode, KernelError, ToolError, TransportError, WireError,
};
pub use execution::{
    ExecMode, ExecuteOptions, ExecutionErrorDetails, ExecutionResult, OutputFragment,
};
pub use id::{CaseId, RequestId, SessionId};
pub use invocation::ToolInvocation;
pub use time::{DurationMs, TimestampMs};
pub use transport::Transport;
pub use variables::{
    KernelInfo, KernelStatus, SortBy, SortOrder, SortSpec, StackFrame, ValueDescription,
    VariableFilter,
};
