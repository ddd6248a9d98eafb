//! The session-scoped execution lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use warden_protocol::{
    ExecuteOptions, ExecutionErrorDetails, ExecutionResult, KernelError, KernelInfo, KernelStatus,
    StackFrame, ValueDescription, VariableFilter,
};

use crate::local::LocalKernel;
use crate::sandbox::Sandbox;

/// Cloneable session handle to one [`LocalKernel`] behind one lock.
///
/// The lock is a `tokio::sync::Mutex`, whose waiters are woken in FIFO
/// order of their acquisition attempt. That single property carries two
/// invariants of the system:
///
/// - no two executions ever overlap, and
/// - approved cases reach the kernel in the order their approvals
///   completed, because each one tries the lock at that moment.
///
/// Reads queue on the same lock (no reader/writer split), but bound their
/// wait: a kernel held busy longer than `busy_timeout` turns reads into
/// [`KernelError::Busy`] instead of stalling the session's read path.
/// `execute` waits as long as it takes.
#[derive(Clone)]
pub struct SharedKernel {
    inner: Arc<Mutex<LocalKernel>>,
    dead: Arc<AtomicBool>,
    busy_timeout: Duration,
}

impl SharedKernel {
    /// Wrap a kernel in a session lock with the default 5 s read bound.
    pub fn new(kernel: LocalKernel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(kernel)),
            dead: Arc::new(AtomicBool::new(false)),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Adjust the read-path acquisition bound.
    #[must_use]
    pub fn with_busy_timeout(mut self, bound: Duration) -> Self {
        self.busy_timeout = bound;
        self
    }

    /// Mark the kernel dead. In-flight calls finish; subsequent calls get
    /// [`KernelError::Dead`]. Idempotent.
    pub fn shutdown(&self) {
        if !self.dead.swap(true, Ordering::SeqCst) {
            tracing::info!("kernel shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    fn check_alive(&self) -> Result<(), KernelError> {
        if self.is_dead() {
            Err(KernelError::Dead)
        } else {
            Ok(())
        }
    }

    /// Bounded acquisition for the read path.
    async fn read_lock(&self) -> Result<MutexGuard<'_, LocalKernel>, KernelError> {
        self.check_alive()?;
        tokio::time::timeout(self.busy_timeout, self.inner.lock())
            .await
            .map_err(|_| KernelError::Busy)
    }
}

#[async_trait]
impl Sandbox for SharedKernel {
    async fn execute(
        &self,
        code: &str,
        opts: ExecuteOptions,
    ) -> Result<ExecutionResult, KernelError> {
        self.check_alive()?;
        // Unbounded wait: writers queue FIFO behind whatever is running.
        let mut kernel = self.inner.lock().await;
        self.check_alive()?;
        Ok(kernel.execute(code, &opts))
    }

    async fn inspect(&self, name: &str, deep: bool) -> Result<ValueDescription, KernelError> {
        self.read_lock().await?.inspect(name, deep)
    }

    async fn list_names(
        &self,
        filter: &VariableFilter,
    ) -> Result<(Vec<ValueDescription>, usize), KernelError> {
        self.read_lock().await?.list(filter)
    }

    async fn info(&self) -> Result<KernelInfo, KernelError> {
        if self.is_dead() {
            return Ok(KernelInfo {
                status: KernelStatus::Dead,
                language: "warden-script".to_string(),
                execution_count: 0,
                namespace_size: 0,
            });
        }
        Ok(self.read_lock().await?.info())
    }

    async fn stack_trace(
        &self,
        include_locals: bool,
        max_frames: usize,
    ) -> Result<Vec<StackFrame>, KernelError> {
        Ok(self
            .read_lock()
            .await?
            .stack_trace(include_locals, max_frames))
    }

    async fn last_error(&self) -> Result<Option<ExecutionErrorDetails>, KernelError> {
        Ok(self.read_lock().await?.last_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn shared() -> SharedKernel {
        SharedKernel::new(LocalKernel::new())
    }

    #[tokio::test]
    async fn execute_then_inspect() {
        let k = shared();
        let r = k.execute("x = 1", ExecuteOptions::default()).await.unwrap();
        assert!(r.success);
        let desc = k.inspect("x", true).await.unwrap();
        assert_eq!(desc.value, Some(json!(1)));
    }

    #[tokio::test]
    async fn executions_serialize_fifo() {
        let k = shared();
        let mut handles = Vec::new();
        for i in 0..8 {
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                k.execute(&format!("v{i} = {i}"), ExecuteOptions::default())
                    .await
                    .unwrap()
            }));
        }
        let mut counts: Vec<u64> = Vec::new();
        for h in handles {
            counts.push(h.await.unwrap().execution_count);
        }
        counts.sort_unstable();
        // Every execution got a distinct counter value: none overlapped.
        assert_eq!(counts, (1..=8).collect::<Vec<_>>());
        let info = k.info().await.unwrap();
        assert_eq!(info.namespace_size, 8);
    }

    #[tokio::test]
    async fn reads_report_busy_when_lock_is_held() {
        let k = SharedKernel::new(LocalKernel::new())
            .with_busy_timeout(Duration::from_millis(20));
        // Hold the lock directly, standing in for a long execution.
        let guard = k.inner.lock().await;
        let err = k.inspect("x", false).await.unwrap_err();
        assert!(matches!(err, KernelError::Busy));
        drop(guard);
        // Lock released: reads work again (and report a real miss).
        assert!(matches!(
            k.inspect("x", false).await,
            Err(KernelError::VariableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_turns_calls_into_dead() {
        let k = shared();
        k.execute("x = 1", ExecuteOptions::default()).await.unwrap();
        k.shutdown();
        assert!(matches!(
            k.execute("y = 2", ExecuteOptions::default()).await,
            Err(KernelError::Dead)
        ));
        assert!(matches!(
            k.inspect("x", false).await,
            Err(KernelError::Dead)
        ));
        let info = k.info().await.unwrap();
        assert_eq!(info.status, KernelStatus::Dead);
    }
}
