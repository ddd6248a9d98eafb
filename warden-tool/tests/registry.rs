use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_protocol::ToolError;
use warden_tool::*;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct EchoArgs {
    text: String,
}

#[derive(Debug, Serialize)]
struct EchoOutput {
    text: String,
}

#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
enum EchoError {
    #[error("echo failed: {0}")]
    Failed(String),
}

struct EchoTool;

impl Tool for EchoTool {
    const NAME: &'static str = "echo";
    type Args = EchoArgs;
    type Output = EchoOutput;
    type Error = EchoError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Echo the input back".into(),
            input_schema: serde_json::to_value(schemars::schema_for!(EchoArgs)).unwrap(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        Ok(EchoOutput { text: args.text })
    }
}

struct SlowTool;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SlowArgs {}

impl Tool for SlowTool {
    const NAME: &'static str = "slow";
    type Args = SlowArgs;
    type Output = ();
    type Error = EchoError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Sleeps past any reasonable timeout".into(),
            input_schema: serde_json::to_value(schemars::schema_for!(SlowArgs)).unwrap(),
        }
    }

    async fn call(&self, _args: Self::Args, _ctx: &ToolContext) -> Result<(), EchoError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

fn call(name: &str, input: serde_json::Value) -> ToolCall {
    ToolCall {
        id: "call-1".into(),
        name: name.into(),
        input,
    }
}

fn ctx() -> ToolContext {
    ToolContext::new("test-session")
}

#[tokio::test]
async fn register_and_execute_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);

    let result = registry
        .execute(&call("echo", serde_json::json!({"text": "hi"})), &ctx())
        .await
        .unwrap();
    assert_eq!(result["text"], "hi");
}

#[test]
fn classification_is_per_registration() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::RequiresApproval);
    assert_eq!(
        registry.classify("echo"),
        Some(AccessClass::RequiresApproval)
    );
    assert_eq!(registry.classify("missing"), None);
}

#[test]
fn definitions_lists_all_tools() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);
    registry.register(SlowTool, AccessClass::Auto);
    let defs = registry.definitions();
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].name, "echo");
    assert_eq!(defs[1].name, "slow");
}

#[tokio::test]
async fn execute_unknown_tool_returns_not_found() {
    let registry = ToolRegistry::new();
    let err = registry
        .execute(&call("nonexistent", serde_json::json!({})), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn malformed_input_is_invalid_input() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);
    let err = registry
        .execute(&call("echo", serde_json::json!({"text": 7})), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
}

#[tokio::test]
async fn middleware_runs_in_order_global_then_per_tool() {
    let order = Arc::new(AtomicUsize::new(0));

    let global_seen = Arc::new(AtomicUsize::new(usize::MAX));
    let per_tool_seen = Arc::new(AtomicUsize::new(usize::MAX));

    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);

    {
        let order = Arc::clone(&order);
        let seen = Arc::clone(&global_seen);
        registry.add_middleware(tool_middleware_fn(move |call, ctx, next| {
            let order = Arc::clone(&order);
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                seen.store(order.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
                next.run(call, ctx).await
            })
        }));
    }
    {
        let order = Arc::clone(&order);
        let seen = Arc::clone(&per_tool_seen);
        registry.add_tool_middleware(
            "echo",
            tool_middleware_fn(move |call, ctx, next| {
                let order = Arc::clone(&order);
                let seen = Arc::clone(&seen);
                Box::pin(async move {
                    seen.store(order.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
                    next.run(call, ctx).await
                })
            }),
        );
    }

    registry
        .execute(&call("echo", serde_json::json!({"text": "x"})), &ctx())
        .await
        .unwrap();

    assert_eq!(global_seen.load(Ordering::SeqCst), 0);
    assert_eq!(per_tool_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn middleware_can_short_circuit() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);
    registry.add_middleware(tool_middleware_fn(|_call, _ctx, _next| {
        Box::pin(async move { Err(ToolError::Cancelled) })
    }));

    let err = registry
        .execute(&call("echo", serde_json::json!({"text": "x"})), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Cancelled));
}

#[tokio::test]
async fn timeout_middleware_cuts_off_slow_tools() {
    let mut registry = ToolRegistry::new();
    registry.register(SlowTool, AccessClass::Auto);
    registry.add_middleware(TimeoutMiddleware::new(Duration::from_millis(50)));

    let err = registry
        .execute(&call("slow", serde_json::json!({})), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::ExecutionFailed(_)));
}

#[tokio::test]
async fn schema_validator_rejects_bad_shapes() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool, AccessClass::Auto);
    let validator = SchemaValidator::new(&registry);
    registry.add_middleware(validator);

    let err = registry
        .execute(&call("echo", serde_json::json!("not an object")), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
}
