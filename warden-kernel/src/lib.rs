//! # warden-kernel — the single-writer execution sandbox
//!
//! One session owns one mutable namespace, and everything that touches it
//! goes through one lock. That is the whole concurrency story of this
//! crate, made structural:
//!
//! - [`LocalKernel`] owns the namespace and interprets snippets against it.
//!   It is plain synchronous state with no interior mutability.
//! - [`SharedKernel`] is the session-scoped handle: an `Arc<Mutex<_>>`
//!   whose FIFO lock queue *is* the serialization guarantee. Writers wait
//!   as long as it takes; readers give up after a bound and report busy.
//! - [`Sandbox`] is the trait the rest of the system programs against, so
//!   a process-external kernel can slot in without touching the gateway.
//!
//! Execution failure is data, not an error: a snippet that raises still
//! produces an [`ExecutionResult`](warden_protocol::ExecutionResult) with
//! the raised error captured, and the kernel stays usable for the next
//! call. Only resource-level conditions (dead, busy) surface as
//! [`KernelError`](warden_protocol::KernelError).

#![deny(missing_docs)]

mod interp;
mod local;
mod sandbox;
mod shared;

pub use local::{KernelConfig, LocalKernel};
pub use sandbox::Sandbox;
pub use shared::SharedKernel;
