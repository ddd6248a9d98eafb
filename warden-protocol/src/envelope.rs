//! The wire envelope and every payload it can carry.
//!
//! One schema serves both directions of the channel. Requests carry a
//! `type` tag and type-specific `params`; responses carry `request_id`,
//! `success`, and `data` or `error`; the approval notification travels as
//! an event payload, not a response. Unknown `type` tags fail
//! deserialization, which the broker surfaces as `INVALID_REQUEST`.

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::execution::{ExecuteOptions, ExecutionErrorDetails, OutputFragment};
use crate::id::{CaseId, RequestId};
use crate::time::TimestampMs;
use crate::variables::{SortSpec, StackFrame, ValueDescription, VariableFilter};

/// Protocol version stamped on every envelope.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// The framing every message travels in, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Unique message id. For requests this is the id responses correlate
    /// on; it is immutable once issued and never reused within a session.
    pub id: RequestId,
    /// Wall-clock send time.
    pub timestamp: TimestampMs,
    /// Protocol version of the sender.
    pub version: String,
    /// The actual message.
    #[serde(flatten)]
    pub payload: WirePayload,
}

impl WireEnvelope {
    /// Wrap a payload with the given id, stamping time and version.
    pub fn new(id: RequestId, payload: WirePayload) -> Self {
        Self {
            id,
            timestamp: TimestampMs::now(),
            version: PROTOCOL_VERSION.to_string(),
            payload,
        }
    }

    /// Build a success response envelope.
    pub fn response_ok(id: RequestId, request_id: RequestId, data: serde_json::Value) -> Self {
        Self::new(
            id,
            WirePayload::Response(ResponseBody {
                request_id,
                success: true,
                data: Some(data),
                error: None,
            }),
        )
    }

    /// Build an error response envelope.
    pub fn response_err(id: RequestId, request_id: RequestId, error: WireError) -> Self {
        Self::new(
            id,
            WirePayload::Response(ResponseBody {
                request_id,
                success: false,
                data: None,
                error: Some(error),
            }),
        )
    }
}

/// Everything that can appear after the envelope's `type` tag.
///
/// Deliberately exhaustive: the session service matches every variant,
/// so a new message type is a compile error until it is routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WirePayload {
    /// List namespace variables with filtering and sorting.
    GetVariables {
        /// Filter and sort options.
        #[serde(default)]
        params: GetVariablesParams,
    },
    /// Inspect a single variable.
    InspectVariable {
        /// Which variable, and how deep.
        params: InspectVariableParams,
    },
    /// Execute a snippet. Always routed through the gated path.
    ExecuteCode {
        /// The snippet and its options.
        params: ExecuteCodeParams,
    },
    /// Kernel status summary.
    GetKernelInfo,
    /// Recent execution history.
    GetHistory {
        /// Window and search options.
        #[serde(default)]
        params: GetHistoryParams,
    },
    /// Frames of the most recent execution error.
    GetStackTrace {
        /// Verbosity options.
        #[serde(default)]
        params: GetStackTraceParams,
    },
    /// The client's verdict on a pending approval case.
    DecideApproval {
        /// Which case, and the verdict.
        params: DecideApprovalParams,
    },
    /// A response correlated to an earlier request.
    Response(ResponseBody),
    /// Out-of-band notification that a gated action awaits approval.
    ApprovalRequest(ApprovalRequestEvent),
}

impl WirePayload {
    /// The wire spelling of this payload's `type` tag, for tracing.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetVariables { .. } => "get_variables",
            Self::InspectVariable { .. } => "inspect_variable",
            Self::ExecuteCode { .. } => "execute_code",
            Self::GetKernelInfo => "get_kernel_info",
            Self::GetHistory { .. } => "get_history",
            Self::GetStackTrace { .. } => "get_stack_trace",
            Self::DecideApproval { .. } => "decide_approval",
            Self::Response(_) => "response",
            Self::ApprovalRequest(_) => "approval_request",
        }
    }
}

/// Parameters for `get_variables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetVariablesParams {
    /// Which variables to keep.
    #[serde(default)]
    pub filter: VariableFilter,
    /// How to order the listing.
    #[serde(default)]
    pub sort: SortSpec,
}

/// Parameters for `inspect_variable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InspectVariableParams {
    /// The variable name.
    pub name: String,
    /// Whether to include attributes and the full value.
    #[serde(default)]
    pub deep: bool,
}

/// Parameters for `execute_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteCodeParams {
    /// The snippet to run.
    pub code: String,
    /// Mode, capture, and timeout options, inline with `code` on the wire.
    #[serde(flatten)]
    pub options: ExecuteOptions,
}

/// Parameters for `get_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetHistoryParams {
    /// How many most-recent entries to return.
    #[serde(default = "default_n_items")]
    pub n_items: usize,
    /// Case-insensitive substring filter over the submitted code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

fn default_n_items() -> usize {
    10
}

impl Default for GetHistoryParams {
    fn default() -> Self {
        Self {
            n_items: default_n_items(),
            search: None,
        }
    }
}

/// Parameters for `get_stack_trace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetStackTraceParams {
    /// Whether frames carry their local bindings.
    #[serde(default)]
    pub include_locals: bool,
    /// Frame cap.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

fn default_max_frames() -> usize {
    10
}

impl Default for GetStackTraceParams {
    fn default() -> Self {
        Self {
            include_locals: false,
            max_frames: default_max_frames(),
        }
    }
}

/// The client's verdict on one approval case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Run the gated action.
    Approve,
    /// Discard the gated action without running it.
    Reject,
}

/// Parameters for `decide_approval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecideApprovalParams {
    /// The case being decided.
    pub case_id: CaseId,
    /// The verdict.
    pub decision: ApprovalDecision,
}

/// Body of a response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Which request this answers.
    pub request_id: RequestId,
    /// Whether the request succeeded.
    pub success: bool,
    /// Type-specific result data, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// The failure, present when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// Out-of-band notification that a gated action awaits a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequestEvent {
    /// The case awaiting a decision.
    pub case_id: CaseId,
    /// Registry name of the gated tool.
    pub tool_name: String,
    /// Human-readable rendering of the pending action.
    pub description: String,
    /// The invocation's arguments, rendered for display.
    pub arguments: serde_json::Value,
}

/// Data payload of a `get_variables` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablesData {
    /// The filtered, sorted listing.
    pub variables: Vec<ValueDescription>,
    /// Namespace size before filtering.
    pub total_count: usize,
    /// Listing size after filtering.
    pub filtered_count: usize,
}

/// Data payload of an `inspect_variable` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectData {
    /// The inspected name.
    pub name: String,
    /// What the namespace knows about it.
    pub info: ValueDescription,
}

/// One remembered execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The execution counter after the call.
    pub execution_count: u64,
    /// When the call ran.
    pub timestamp: TimestampMs,
    /// The submitted code.
    pub input: String,
    /// Whether it succeeded.
    pub success: bool,
    /// Captured output fragments.
    pub outputs: Vec<OutputFragment>,
}

/// Data payload of a `get_history` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryData {
    /// The matching entries, oldest first.
    pub items: Vec<HistoryEntry>,
    /// Total entries remembered, before windowing.
    pub total_count: usize,
}

/// Data payload of a `get_stack_trace` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackTraceData {
    /// Frames of the most recent error, innermost first.
    pub frames: Vec<StackFrame>,
    /// The error itself, if one is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExecutionErrorDetails>,
    /// Whether an error is currently recorded.
    pub is_active: bool,
}

/// Data payload of a `decide_approval` response.
///
/// The decision request is acknowledged on its own; the gated action's
/// result answers the request that proposed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAck {
    /// The case that was decided.
    pub case_id: CaseId,
    /// Whether the decision was recorded.
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_matches_wire_shape() {
        let raw = json!({
            "id": "req-7",
            "timestamp": 1_700_000_000_000i64,
            "version": "1.0.0",
            "type": "inspect_variable",
            "params": {"name": "x", "deep": true}
        });
        let env: WireEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(env.id.as_str(), "req-7");
        match env.payload {
            WirePayload::InspectVariable { params } => {
                assert_eq!(params.name, "x");
                assert!(params.deep);
            }
            other => panic!("expected inspect_variable, got {:?}", other),
        }
    }

    #[test]
    fn get_kernel_info_tolerates_missing_params() {
        let raw = json!({
            "id": "req-8",
            "timestamp": 0,
            "version": "1.0.0",
            "type": "get_kernel_info"
        });
        let env: WireEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(env.payload.kind(), "get_kernel_info");
    }

    #[test]
    fn execute_code_flattens_options() {
        let raw = json!({
            "id": "req-9",
            "timestamp": 0,
            "version": "1.0.0",
            "type": "execute_code",
            "params": {"code": "x = 1", "mode": "exec", "capture_output": true}
        });
        let env: WireEnvelope = serde_json::from_value(raw).unwrap();
        match env.payload {
            WirePayload::ExecuteCode { params } => {
                assert_eq!(params.code, "x = 1");
                assert!(params.options.capture_output);
            }
            other => panic!("expected execute_code, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_fails_deserialization() {
        let raw = json!({
            "id": "req-10",
            "timestamp": 0,
            "version": "1.0.0",
            "type": "reticulate_splines"
        });
        assert!(serde_json::from_value::<WireEnvelope>(raw).is_err());
    }

    #[test]
    fn response_round_trips() {
        let env = WireEnvelope::response_ok(
            RequestId::new("resp-1"),
            RequestId::new("req-1"),
            json!({"variables": []}),
        );
        let raw = serde_json::to_value(&env).unwrap();
        assert_eq!(raw["type"], "response");
        assert_eq!(raw["request_id"], "req-1");
        assert_eq!(raw["success"], true);
        let back: WireEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn decision_spelling() {
        let p: DecideApprovalParams =
            serde_json::from_value(json!({"case_id": "K", "decision": "approve"})).unwrap();
        assert_eq!(p.decision, ApprovalDecision::Approve);
    }
}
