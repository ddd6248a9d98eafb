//! # warden-approval — the approval-gated execution state machine
//!
//! One [`ApprovalCase`] tracks one proposed gated invocation from proposal
//! to a terminal outcome. The lifecycle is an explicit state machine driven
//! by discrete events — a decision, a timeout, a session closing — rather
//! than suspended-coroutine control flow, so every intermediate state is
//! inspectable and testable:
//!
//! ```text
//! Proposed → AwaitingApproval → Executing → Executed
//!                          │            └→ Failed
//!                          ├→ Rejected
//!                          └→ TimedOut
//! ```
//!
//! The [`ApprovalDesk`] owns the pending-case table and is the only
//! component that mutates case state. The first decision wins; everything
//! after it — duplicate decisions, decisions on terminal or unknown cases
//! — fails without touching anything. Rejection and timeout are terminal
//! before any sandbox call, so they are always side-effect-free.

#![deny(missing_docs)]

mod case;
mod desk;

pub use case::{ApprovalCase, CaseState};
pub use desk::{ApprovalDesk, DeskConfig, PendingDecision};
