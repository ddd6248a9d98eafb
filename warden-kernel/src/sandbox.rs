//! The sandbox boundary trait.

use async_trait::async_trait;

use warden_protocol::{
    ExecuteOptions, ExecutionErrorDetails, ExecutionResult, KernelError, KernelInfo, StackFrame,
    ValueDescription, VariableFilter,
};

/// What the gateway and the session service require of an execution
/// sandbox.
///
/// `execute` mutates the namespace and must be the only mutating entry
/// point; implementations serialize it against everything else. The read
/// operations may be queued behind an in-progress execution — callers get
/// [`KernelError::Busy`] if that wait exceeds the implementation's bound.
///
/// Failure inside a snippet is not an `Err`: it comes back as data inside
/// [`ExecutionResult`]. `Err` is reserved for resource-level conditions —
/// the kernel being dead, busy, or not yet attached.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run one snippet against the namespace.
    async fn execute(
        &self,
        code: &str,
        opts: ExecuteOptions,
    ) -> Result<ExecutionResult, KernelError>;

    /// Describe one variable.
    async fn inspect(&self, name: &str, deep: bool) -> Result<ValueDescription, KernelError>;

    /// List variables matching a filter, plus the unfiltered namespace size.
    async fn list_names(
        &self,
        filter: &VariableFilter,
    ) -> Result<(Vec<ValueDescription>, usize), KernelError>;

    /// Point-in-time kernel summary. Works even on a dead kernel, which
    /// reports itself as such.
    async fn info(&self) -> Result<KernelInfo, KernelError>;

    /// Frames of the most recent execution error.
    async fn stack_trace(
        &self,
        include_locals: bool,
        max_frames: usize,
    ) -> Result<Vec<StackFrame>, KernelError>;

    /// The most recent execution error, if the last execution failed.
    async fn last_error(&self) -> Result<Option<ExecutionErrorDetails>, KernelError>;
}
