//! The one error type the session surfaces, and its wire mapping.

use warden_protocol::{ApprovalError, ErrorCode, KernelError, ToolError, WireError};

/// Anything that can go wrong answering a request.
///
/// Sandbox failures never appear here — a snippet that raised still
/// produces result data, and the service decides how to surface it. This
/// type covers bookkeeping and resource failures: bad requests, approval
/// lifecycle violations, kernel availability.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or unknown request.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// A tool failed or was misused.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// An approval-lifecycle rule was violated, or the case ended without
    /// an approval.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// The kernel refused the call.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// A fully-formed wire error (used when the code/details are already
    /// decided, e.g. for failed executions).
    #[error("{}", .0.message)]
    Wire(WireError),
}

impl ServiceError {
    /// Render for the wire.
    #[must_use]
    pub fn to_wire(&self) -> WireError {
        match self {
            Self::Invalid(message) => WireError::new(ErrorCode::InvalidRequest, message.clone()),
            Self::Tool(tool) => match tool {
                ToolError::NotFound(name) => WireError::new(
                    ErrorCode::InvalidRequest,
                    format!("unknown tool: {name}"),
                ),
                ToolError::InvalidInput(message) => {
                    WireError::new(ErrorCode::InvalidRequest, message.clone())
                }
                ToolError::Cancelled => {
                    WireError::new(ErrorCode::SessionClosed, "session closed")
                }
                ToolError::Kernel(kernel) => WireError::new(kernel.code(), kernel.to_string()),
                ToolError::ExecutionFailed(source) => {
                    WireError::new(ErrorCode::ExecutionError, source.to_string())
                }
            },
            Self::Approval(approval) => WireError::new(approval.code(), approval.to_string()),
            Self::Kernel(kernel) => WireError::new(kernel.code(), kernel.to_string()),
            Self::Wire(error) => error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_errors_keep_their_codes() {
        let e = ServiceError::Approval(ApprovalError::AlreadyDecided("K".into()));
        assert_eq!(e.to_wire().code, ErrorCode::AlreadyDecided);

        let e = ServiceError::Approval(ApprovalError::Rejected("K".into()));
        assert_eq!(e.to_wire().code, ErrorCode::ApprovalRejected);

        let e = ServiceError::Approval(ApprovalError::UnknownCase("K".into()));
        assert_eq!(e.to_wire().code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn kernel_errors_keep_their_codes_through_tool_erasure() {
        let e = ServiceError::Tool(ToolError::Kernel(KernelError::VariableNotFound("x".into())));
        assert_eq!(e.to_wire().code, ErrorCode::VariableNotFound);

        let e = ServiceError::Kernel(KernelError::Busy);
        assert_eq!(e.to_wire().code, ErrorCode::KernelBusy);
    }

    #[test]
    fn invalid_maps_to_invalid_request() {
        let e = ServiceError::Invalid("no such type".into());
        let wire = e.to_wire();
        assert_eq!(wire.code, ErrorCode::InvalidRequest);
        assert!(wire.message.contains("no such type"));
    }
}
