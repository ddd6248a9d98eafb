//! Core tool traits and types.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use warden_protocol::{KernelError, SessionId, ToolError};

/// Boxed future alias used by the dyn-compatible trait and middleware.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether a tool runs immediately or only after explicit approval.
///
/// The classification is a property of the registration, fixed at session
/// start. Read-only operations are `Auto`; anything that can mutate the
/// namespace or the workspace is `RequiresApproval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessClass {
    /// Runs as soon as it is dispatched.
    Auto,
    /// Runs only after an out-of-band approval decision.
    RequiresApproval,
}

/// Metadata describing one registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique registry name.
    pub name: String,
    /// What the tool does, for the reasoning layer.
    pub description: String,
    /// JSON Schema of the tool's arguments.
    pub input_schema: serde_json::Value,
}

/// Ambient context handed to every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The session this call belongs to.
    pub session_id: SessionId,
    /// Cancelled when the session tears down.
    pub cancellation_token: CancellationToken,
}

impl ToolContext {
    /// Context for the given session with a fresh token.
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            cancellation_token: CancellationToken::new(),
        }
    }
}

/// A strongly-typed tool.
///
/// Implementations hold whatever handles they need (a kernel, a workspace
/// root) at construction time; `call` only sees typed arguments and the
/// ambient context.
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    const NAME: &'static str;
    /// The deserialized input type.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// The serializable output type.
    type Output: Serialize;
    /// The tool-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the tool definition (name, description, schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with typed arguments.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Object-safe tool interface used by the registry.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// The tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;
    /// Execute with a JSON input, returning JSON output.
    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>;
}

/// Blanket implementation: any [`Tool`] automatically becomes a [`ToolDyn`].
///
/// Handles:
/// - Deserializing `serde_json::Value` into `T::Args`
/// - Calling `T::call(args, ctx)`
/// - Serializing `T::Output` back into JSON
/// - Mapping `T::Error` into [`ToolError`], preserving [`KernelError`]s so
///   their wire codes survive the erasure
impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            match self.call(args, ctx).await {
                Ok(output) => serde_json::to_value(output)
                    .map_err(|e| ToolError::ExecutionFailed(Box::new(e))),
                Err(e) => {
                    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
                    let boxed = match boxed.downcast::<KernelError>() {
                        Ok(kernel) => return Err(ToolError::Kernel(*kernel)),
                        Err(other) => other,
                    };
                    match boxed.downcast::<ToolError>() {
                        Ok(tool) => Err(*tool),
                        Err(other) => Err(ToolError::ExecutionFailed(other)),
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_class_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&AccessClass::RequiresApproval).unwrap(),
            "\"requires_approval\""
        );
    }

    #[test]
    fn tool_context_tokens_are_independent() {
        let a = ToolContext::new("s-1");
        let b = ToolContext::new("s-1");
        a.cancellation_token.cancel();
        assert!(a.cancellation_token.is_cancelled());
        assert!(!b.cancellation_token.is_cancelled());
    }
}
