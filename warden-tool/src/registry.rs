//! Tool registry: register, classify, look up, and execute tools.

use std::collections::HashMap;
use std::sync::Arc;

use warden_protocol::ToolError;

use crate::middleware::{Next, ToolCall, ToolMiddleware};
use crate::types::{AccessClass, Tool, ToolContext, ToolDefinition, ToolDyn};

/// Registry of tools, each carrying its [`AccessClass`], with optional
/// middleware pipelines.
///
/// Tools are stored as type-erased [`ToolDyn`] trait objects. The
/// classification is fixed at registration: callers ask
/// [`classify`](Self::classify) and never re-derive gating from the tool
/// itself. Middleware can be added globally (applies to all tools) or
/// per-tool.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    global_middleware: Vec<Arc<dyn ToolMiddleware>>,
    tool_middleware: HashMap<String, Vec<Arc<dyn ToolMiddleware>>>,
}

struct RegisteredTool {
    tool: Arc<dyn ToolDyn>,
    access: AccessClass,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            global_middleware: Vec::new(),
            tool_middleware: HashMap::new(),
        }
    }

    /// Register a strongly-typed tool with its classification
    /// (auto-erased to `ToolDyn`).
    pub fn register<T: Tool + 'static>(&mut self, tool: T, access: AccessClass) {
        self.register_dyn(Arc::new(tool), access);
    }

    /// Register a pre-erased tool with its classification.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>, access: AccessClass) {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, ?access, "tool registered");
        self.tools.insert(name, RegisteredTool { tool, access });
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).map(|r| Arc::clone(&r.tool))
    }

    /// The classification of a registered tool.
    pub fn classify(&self, name: &str) -> Option<AccessClass> {
        self.tools.get(name).map(|r| r.access)
    }

    /// Names of all registered tools, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get definitions for all registered tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|r| r.tool.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Add global middleware (applies to all tool executions).
    pub fn add_middleware(&mut self, m: impl ToolMiddleware + 'static) -> &mut Self {
        self.global_middleware.push(Arc::new(m));
        self
    }

    /// Add middleware that only applies to a specific tool.
    pub fn add_tool_middleware(
        &mut self,
        tool_name: &str,
        m: impl ToolMiddleware + 'static,
    ) -> &mut Self {
        self.tool_middleware
            .entry(tool_name.to_string())
            .or_default()
            .push(Arc::new(m));
        self
    }

    /// Execute a tool by name, running it through the middleware chain.
    ///
    /// Middleware order: global middleware first, then per-tool middleware,
    /// then the actual tool. Classification is NOT checked here — this is
    /// the raw execution path; gating happens in the gateway before a call
    /// ever reaches the registry.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let registered = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        // Build combined middleware chain: global + per-tool
        let mut chain: Vec<Arc<dyn ToolMiddleware>> = self.global_middleware.clone();
        if let Some(per_tool) = self.tool_middleware.get(&call.name) {
            chain.extend(per_tool.iter().cloned());
        }

        let next = Next::new(registered.tool.as_ref(), &chain);
        next.run(call, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
