//! # warden — an approval-gated code-execution backend
//!
//! A remote client drives a stateful execution kernel over an ordered
//! message channel, and nothing side-effecting runs without an explicit
//! out-of-band confirmation. This crate composes the pieces:
//!
//! - [`warden_broker::MessageBroker`] owns the wire: ids, correlation,
//!   timeouts, teardown.
//! - [`Gateway`] classifies every proposed invocation against the
//!   [`warden_tool::ToolRegistry`] and dispatches it — immediately for
//!   read-only tools, through an [`warden_approval::ApprovalDesk`] case
//!   for anything that mutates.
//! - [`warden_kernel::SharedKernel`] is the single-writer sandbox both
//!   paths ultimately reach.
//! - [`SessionService`] ties one transport, one kernel, one registry, and
//!   one desk into one session, and tears the whole thing down when the
//!   channel closes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden::{SessionConfig, SessionService};
//! use warden_protocol::test_utils::duplex;
//!
//! # async fn demo() {
//! let (client_side, server_side) = duplex(64);
//! let service = SessionService::attach(Arc::new(server_side), SessionConfig::default());
//! // drive `client_side` from the UI; `service` answers until it closes
//! # let _ = (client_side, service);
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod service;
pub mod tools;

pub use error::ServiceError;
pub use gateway::Gateway;
pub use service::{SessionConfig, SessionService};
pub use tools::default_registry;

pub use warden_approval::{ApprovalCase, ApprovalDesk, CaseState, DeskConfig};
pub use warden_broker::{BrokerConfig, MessageBroker};
pub use warden_kernel::{KernelConfig, LocalKernel, Sandbox, SharedKernel};
pub use warden_tool::{AccessClass, ToolContext, ToolRegistry};
