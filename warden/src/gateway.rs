//! The tool classification gateway.
//!
//! Every proposed invocation passes through [`Gateway::dispatch`],
//! whatever its classification — callers never special-case the two
//! paths. Auto tools go straight to the registry. Gated tools open an
//! approval case, suspend here until it resolves, and only an explicit
//! approval lets the one sandbox call happen.

use std::sync::Arc;

use warden_approval::{ApprovalDesk, CaseState};
use warden_protocol::{ApprovalDecision, ApprovalError, ToolInvocation};
use warden_tool::{AccessClass, ToolCall, ToolContext, ToolRegistry};

use crate::error::ServiceError;

/// Classifies invocations and routes them to execution.
pub struct Gateway {
    registry: Arc<ToolRegistry>,
    desk: ApprovalDesk,
}

impl Gateway {
    /// Build a gateway over a registry snapshot and an approval desk.
    pub fn new(registry: Arc<ToolRegistry>, desk: ApprovalDesk) -> Self {
        Self { registry, desk }
    }

    /// The registry this gateway consults.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The classification of a tool, if it is registered.
    pub fn classify(&self, tool_name: &str) -> Option<AccessClass> {
        self.registry.classify(tool_name)
    }

    /// Dispatch one invocation and return its result data.
    ///
    /// For `RequiresApproval` tools this suspends until the case resolves.
    /// Rejection and timeout return their approval error with no sandbox
    /// call made. After an approval, the single execution happens here and
    /// the case finishes `Executed` or `Failed` — a result carrying
    /// `"success": false` is a sandbox raise and counts as `Failed`.
    ///
    /// Approved cases reach the sandbox in the order their approvals
    /// completed, not the order they were proposed: each one queues on the
    /// session execution lock at its approval moment. An early-proposed,
    /// late-approved case therefore waits behind later proposals that were
    /// approved sooner.
    pub async fn dispatch(
        &self,
        invocation: ToolInvocation,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ServiceError> {
        let access = self
            .classify(&invocation.tool_name)
            .ok_or_else(|| ServiceError::Invalid(format!("unknown tool: {}", invocation.tool_name)))?;

        match access {
            AccessClass::Auto => {
                let call = ToolCall {
                    id: invocation
                        .origin_request_id
                        .as_ref()
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    name: invocation.tool_name.clone(),
                    input: invocation.arguments.clone(),
                };
                Ok(self.registry.execute(&call, ctx).await?)
            }
            AccessClass::RequiresApproval => self.dispatch_gated(invocation, ctx).await,
        }
    }

    async fn dispatch_gated(
        &self,
        invocation: ToolInvocation,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ServiceError> {
        let pending = self.desk.propose(invocation.clone())?;
        let case_id = pending.case_id().clone();
        tracing::debug!(case_id = %case_id, tool = %invocation.tool_name, "gated dispatch suspended");

        match pending.decision().await {
            Ok(ApprovalDecision::Approve) => {
                let call = ToolCall {
                    id: case_id.to_string(),
                    name: invocation.tool_name.clone(),
                    input: invocation.arguments.clone(),
                };
                let result = self.registry.execute(&call, ctx).await;
                let outcome = match &result {
                    Ok(value) if value.get("success") == Some(&serde_json::Value::Bool(false)) => {
                        CaseState::Failed
                    }
                    Ok(_) => CaseState::Executed,
                    Err(_) => CaseState::Failed,
                };
                self.desk.complete(&case_id, outcome);
                Ok(result?)
            }
            Ok(ApprovalDecision::Reject) => {
                Err(ApprovalError::Rejected(case_id.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
