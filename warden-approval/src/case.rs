//! The approval case record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_protocol::{CaseId, ToolInvocation};

/// Where one approval case is in its lifecycle.
///
/// `Proposed` and `AwaitingApproval` are the same observable state, split
/// for instrumentation: a case is constructed `Proposed` and transitioned
/// immediately, so the first state a client can see is `AwaitingApproval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    /// Just created by the gateway; not yet announced.
    Proposed,
    /// Announced to the client; waiting on a decision.
    AwaitingApproval,
    /// Approved; the single sandbox call is in flight.
    Executing,
    /// The sandbox call completed without raising. Terminal.
    Executed,
    /// The sandbox call raised. Terminal.
    Failed,
    /// Rejected before any sandbox call. Terminal.
    Rejected,
    /// Expired (or the session closed) before any sandbox call. Terminal.
    TimedOut,
}

impl CaseState {
    /// Whether this state ends the lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Executed | Self::Failed | Self::Rejected | Self::TimedOut
        )
    }
}

/// The lifecycle record for one proposed gated invocation.
///
/// Created by the gateway when an invocation classifies as
/// requires-approval; mutated only by the
/// [`ApprovalDesk`](crate::ApprovalDesk); never reused after reaching a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalCase {
    /// Unique id, minted at proposal.
    pub case_id: CaseId,
    /// The gated invocation this case guards.
    pub invocation: ToolInvocation,
    /// Current lifecycle state.
    pub state: CaseState,
    /// When the case was proposed.
    pub created_at: DateTime<Utc>,
    /// When a decision (or timeout) arrived, if one has.
    pub decided_at: Option<DateTime<Utc>>,
    /// Why the case ended the way it did, for terminal states.
    pub decision_reason: Option<String>,
}

impl ApprovalCase {
    /// A fresh case in `Proposed` state.
    pub fn new(case_id: CaseId, invocation: ToolInvocation) -> Self {
        Self {
            case_id,
            invocation,
            state: CaseState::Proposed,
            created_at: Utc::now(),
            decided_at: None,
            decision_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_states() {
        assert!(!CaseState::Proposed.is_terminal());
        assert!(!CaseState::AwaitingApproval.is_terminal());
        assert!(!CaseState::Executing.is_terminal());
        assert!(CaseState::Executed.is_terminal());
        assert!(CaseState::Failed.is_terminal());
        assert!(CaseState::Rejected.is_terminal());
        assert!(CaseState::TimedOut.is_terminal());
    }

    #[test]
    fn new_case_starts_proposed() {
        let case = ApprovalCase::new(
            CaseId::new("k1"),
            ToolInvocation::new("execute_code", json!({"code": "x = 1"})),
        );
        assert_eq!(case.state, CaseState::Proposed);
        assert!(case.decided_at.is_none());
        assert!(case.decision_reason.is_none());
    }
}
