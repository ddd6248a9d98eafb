//! # warden-tool — tool registry with approval classification
//!
//! Tools are named operations the reasoning layer may invoke. Each one is
//! registered with an [`AccessClass`]: `Auto` tools run as soon as they are
//! dispatched, `RequiresApproval` tools may only run after an explicit
//! out-of-band decision. The registry holds that classification statically
//! — adding a gated tool is a registry entry, not a frontend change.
//!
//! The execution pipeline is composable middleware in the axum `from_fn`
//! style: each [`ToolMiddleware`] receives a [`Next`] it can call to
//! continue the chain, or skip to short-circuit.
//!
//! This crate knows nothing about approval bookkeeping; it classifies and
//! executes. The state machine that sits between classification and
//! execution lives in `warden-approval`, and the component that routes
//! between them is the gateway in `warden`.

pub mod builtin;
pub mod middleware;
pub mod registry;
pub mod types;

pub use builtin::{SchemaValidator, TimeoutMiddleware};
pub use middleware::{tool_middleware_fn, Next, ToolCall, ToolMiddleware};
pub use registry::ToolRegistry;
pub use types::{AccessClass, BoxFuture, Tool, ToolContext, ToolDefinition, ToolDyn};
