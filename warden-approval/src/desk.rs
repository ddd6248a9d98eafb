//! The pending-case table and the events that drive it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use warden_protocol::{
    ApprovalDecision, ApprovalError, ApprovalRequestEvent, CaseId, ToolInvocation,
};

use crate::case::{ApprovalCase, CaseState};

/// Tunables for an [`ApprovalDesk`].
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// How long a case waits for a decision. Independent of, and normally
    /// much longer than, the broker's per-request timeout — this one waits
    /// on a human.
    pub approval_timeout: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            approval_timeout: Duration::from_secs(300),
        }
    }
}

struct PendingCase {
    case: ApprovalCase,
    decide_tx: oneshot::Sender<ApprovalDecision>,
}

struct DeskState {
    pending: HashMap<CaseId, PendingCase>,
    /// Cases past their decision point, kept so a late decision gets
    /// `AlreadyDecided` instead of resurrecting the case.
    settled: HashMap<CaseId, ApprovalCase>,
    closed: bool,
}

impl DeskState {
    fn settle(&mut self, mut case: ApprovalCase, state: CaseState, reason: &str) {
        case.state = state;
        if case.decided_at.is_none() {
            case.decided_at = Some(Utc::now());
        }
        case.decision_reason = Some(reason.to_string());
        self.settled.insert(case.case_id.clone(), case);
    }
}

/// The single owner of approval-case state for one session.
///
/// `propose` creates a case and announces it on the event channel;
/// `decide` records the one decision the case will ever take;
/// [`PendingDecision::decision`] is where the gated caller suspends.
/// Cloning shares the underlying table.
#[derive(Clone)]
pub struct ApprovalDesk {
    inner: Arc<Mutex<DeskState>>,
    events: mpsc::UnboundedSender<ApprovalRequestEvent>,
    config: DeskConfig,
}

/// The suspended side of one proposed case. Resolves when the client
/// decides, the approval window expires, or the session closes.
pub struct PendingDecision {
    case_id: CaseId,
    rx: oneshot::Receiver<ApprovalDecision>,
    inner: Arc<Mutex<DeskState>>,
    timeout: Duration,
}

impl ApprovalDesk {
    /// Create a desk and the receiving end of its approval-event stream.
    pub fn new(config: DeskConfig) -> (Self, mpsc::UnboundedReceiver<ApprovalRequestEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(Mutex::new(DeskState {
                    pending: HashMap::new(),
                    settled: HashMap::new(),
                    closed: false,
                })),
                events,
                config,
            },
            events_rx,
        )
    }

    /// Open a case for a gated invocation.
    ///
    /// The case is created `Proposed`, immediately transitioned to
    /// `AwaitingApproval`, and announced on the event channel. Every
    /// proposal gets its own case — identical concurrent invocations are
    /// deliberately not deduplicated, because two runs of the same
    /// arguments can have different side effects.
    pub fn propose(&self, invocation: ToolInvocation) -> Result<PendingDecision, ApprovalError> {
        let case_id = CaseId::new(Uuid::new_v4().to_string());
        let mut case = ApprovalCase::new(case_id.clone(), invocation);
        tracing::debug!(case_id = %case_id, tool = %case.invocation.tool_name, "case proposed");

        let (decide_tx, rx) = oneshot::channel();
        {
            let mut st = self.inner.lock().expect("desk lock poisoned");
            if st.closed {
                return Err(ApprovalError::SessionClosed);
            }
            case.state = CaseState::AwaitingApproval;
            let event = ApprovalRequestEvent {
                case_id: case_id.clone(),
                tool_name: case.invocation.tool_name.clone(),
                description: case.invocation.describe(),
                arguments: case.invocation.arguments.clone(),
            };
            st.pending
                .insert(case_id.clone(), PendingCase { case, decide_tx });
            // Channel is unbounded and the receiver lives as long as the
            // session; a send failure just means teardown already started.
            let _ = self.events.send(event);
        }
        tracing::info!(case_id = %case_id, "awaiting approval");

        Ok(PendingDecision {
            case_id,
            rx,
            inner: Arc::clone(&self.inner),
            timeout: self.config.approval_timeout,
        })
    }

    /// Record the client's decision for a case.
    ///
    /// The first decision wins and moves the case to `Executing` (approve)
    /// or `Rejected` (reject). Anything else — a second decision, a
    /// decision on a terminal case — fails with `AlreadyDecided`, and a
    /// decision on an id that never existed fails with `UnknownCase`.
    /// Neither failure mutates any state.
    pub fn decide(
        &self,
        case_id: &CaseId,
        decision: ApprovalDecision,
    ) -> Result<CaseState, ApprovalError> {
        let mut st = self.inner.lock().expect("desk lock poisoned");

        let Some(mut pending) = st.pending.remove(case_id) else {
            return if st.settled.contains_key(case_id) {
                Err(ApprovalError::AlreadyDecided(case_id.to_string()))
            } else {
                Err(ApprovalError::UnknownCase(case_id.to_string()))
            };
        };

        pending.case.decided_at = Some(Utc::now());

        if pending.decide_tx.send(decision).is_err() {
            // The waiter is gone: its timeout fired between our lookup and
            // the send. The case is over; this decision arrived too late.
            st.settle(pending.case, CaseState::TimedOut, "approval timed out");
            return Err(ApprovalError::AlreadyDecided(case_id.to_string()));
        }

        let next = match decision {
            ApprovalDecision::Approve => {
                st.settle(pending.case, CaseState::Executing, "approved by client");
                CaseState::Executing
            }
            ApprovalDecision::Reject => {
                st.settle(pending.case, CaseState::Rejected, "rejected by client");
                CaseState::Rejected
            }
        };
        tracing::info!(case_id = %case_id, state = ?next, "case decided");
        Ok(next)
    }

    /// Record the outcome of the sandbox call for an approved case.
    pub fn complete(&self, case_id: &CaseId, outcome: CaseState) {
        debug_assert!(outcome.is_terminal());
        let mut st = self.inner.lock().expect("desk lock poisoned");
        if let Some(case) = st.settled.get_mut(case_id) {
            case.state = outcome;
        }
        tracing::info!(case_id = %case_id, state = ?outcome, "case finished");
    }

    /// The state of a case, pending or settled.
    pub fn state_of(&self, case_id: &CaseId) -> Option<CaseState> {
        let st = self.inner.lock().expect("desk lock poisoned");
        st.pending
            .get(case_id)
            .map(|p| p.case.state)
            .or_else(|| st.settled.get(case_id).map(|c| c.state))
    }

    /// The settled record of a case, once it is past its decision point.
    pub fn settled_case(&self, case_id: &CaseId) -> Option<ApprovalCase> {
        let st = self.inner.lock().expect("desk lock poisoned");
        st.settled.get(case_id).cloned()
    }

    /// Snapshot of all cases still awaiting a decision.
    pub fn pending_cases(&self) -> Vec<ApprovalCase> {
        let st = self.inner.lock().expect("desk lock poisoned");
        st.pending.values().map(|p| p.case.clone()).collect()
    }

    /// Close the desk: every awaiting case becomes `TimedOut` (an implicit
    /// rejection) and its waiter wakes with `SessionClosed`. A case whose
    /// sandbox call is already in flight is not touched — that call is
    /// allowed to finish. Idempotent.
    pub fn close(&self) {
        let mut st = self.inner.lock().expect("desk lock poisoned");
        if st.closed {
            return;
        }
        st.closed = true;
        let drained: Vec<CaseId> = st.pending.keys().cloned().collect();
        for case_id in drained {
            if let Some(pending) = st.pending.remove(&case_id) {
                drop(pending.decide_tx);
                st.settle(pending.case, CaseState::TimedOut, "session closed");
                tracing::info!(case_id = %case_id, "case timed out at session close");
            }
        }
    }
}

impl PendingDecision {
    /// The case this decision belongs to.
    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    /// Suspend until the case resolves.
    ///
    /// Resolution is one of: the client's decision, the approval window
    /// expiring (`TimedOut`, recorded before this returns), or the session
    /// closing. Rejection and timeout both guarantee no sandbox call was
    /// or will be made for this case.
    pub async fn decision(mut self) -> Result<ApprovalDecision, ApprovalError> {
        match tokio::time::timeout(self.timeout, &mut self.rx).await {
            Ok(Ok(decision)) => Ok(decision),
            Ok(Err(_)) => Err(ApprovalError::SessionClosed),
            Err(_elapsed) => {
                // A decision may have landed between the timer firing and
                // this cleanup; it wins if it did.
                if let Ok(decision) = self.rx.try_recv() {
                    return Ok(decision);
                }
                let mut st = self.inner.lock().expect("desk lock poisoned");
                if let Some(pending) = st.pending.remove(&self.case_id) {
                    st.settle(pending.case, CaseState::TimedOut, "approval timed out");
                }
                drop(st);
                tracing::info!(case_id = %self.case_id, "approval timed out");
                Err(ApprovalError::TimedOut(self.case_id.to_string()))
            }
        }
    }
}
