//! Tools backed by the session kernel.
//!
//! Each tool holds its own [`SharedKernel`] handle, taken at construction
//! — the registry stays ignorant of what a tool needs to do its job.

use schemars::JsonSchema;
use serde::Deserialize;

use warden_kernel::{Sandbox, SharedKernel};
use warden_protocol::{
    ExecuteCodeParams, ExecutionResult, GetVariablesParams, InspectData, InspectVariableParams,
    KernelError, KernelInfo, SortBy, SortOrder, VariablesData,
};
use warden_tool::{Tool, ToolContext, ToolDefinition};

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// List namespace variables with filtering and sorting.
pub struct GetVariablesTool {
    kernel: SharedKernel,
}

impl GetVariablesTool {
    /// Bind the tool to a kernel.
    pub fn new(kernel: SharedKernel) -> Self {
        Self { kernel }
    }
}

impl Tool for GetVariablesTool {
    const NAME: &'static str = "get_variables";
    type Args = GetVariablesParams;
    type Output = VariablesData;
    type Error = KernelError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "List variables in the kernel namespace, with optional type/pattern \
                          filters and sorting"
                .into(),
            input_schema: schema_of::<GetVariablesParams>(),
        }
    }

    async fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        let (mut variables, total_count) = self.kernel.list_names(&args.filter).await?;

        match args.sort.by {
            SortBy::Name => variables.sort_by(|a, b| a.name.cmp(&b.name)),
            SortBy::Type => {
                variables.sort_by(|a, b| (&a.type_name, &a.name).cmp(&(&b.type_name, &b.name)))
            }
            SortBy::Size => variables.sort_by(|a, b| a.size.cmp(&b.size)),
        }
        if args.sort.order == SortOrder::Desc {
            variables.reverse();
        }

        Ok(VariablesData {
            filtered_count: variables.len(),
            total_count,
            variables,
        })
    }
}

/// Describe a single variable.
pub struct InspectVariableTool {
    kernel: SharedKernel,
}

impl InspectVariableTool {
    /// Bind the tool to a kernel.
    pub fn new(kernel: SharedKernel) -> Self {
        Self { kernel }
    }
}

impl Tool for InspectVariableTool {
    const NAME: &'static str = "inspect_variable";
    type Args = InspectVariableParams;
    type Output = InspectData;
    type Error = KernelError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Inspect one variable: type, size, preview, and (deep) attributes \
                          plus the full value"
                .into(),
            input_schema: schema_of::<InspectVariableParams>(),
        }
    }

    async fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        let info = self.kernel.inspect(&args.name, args.deep).await?;
        Ok(InspectData {
            name: args.name,
            info,
        })
    }
}

/// Arguments for `kernel_info` (none).
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct KernelInfoArgs {}

/// Report kernel status.
pub struct KernelInfoTool {
    kernel: SharedKernel,
}

impl KernelInfoTool {
    /// Bind the tool to a kernel.
    pub fn new(kernel: SharedKernel) -> Self {
        Self { kernel }
    }
}

impl Tool for KernelInfoTool {
    const NAME: &'static str = "kernel_info";
    type Args = KernelInfoArgs;
    type Output = KernelInfo;
    type Error = KernelError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Kernel status: lifecycle state, language, execution count, \
                          namespace size"
                .into(),
            input_schema: schema_of::<KernelInfoArgs>(),
        }
    }

    async fn call(
        &self,
        _args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        self.kernel.info().await
    }
}

/// Run a snippet in the kernel. Always registered `RequiresApproval`.
pub struct ExecuteCodeTool {
    kernel: SharedKernel,
}

impl ExecuteCodeTool {
    /// Bind the tool to a kernel.
    pub fn new(kernel: SharedKernel) -> Self {
        Self { kernel }
    }
}

impl Tool for ExecuteCodeTool {
    const NAME: &'static str = "execute_code";
    type Args = ExecuteCodeParams;
    type Output = ExecutionResult;
    type Error = KernelError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Execute a snippet against the kernel namespace and return its \
                          captured output"
                .into(),
            input_schema: schema_of::<ExecuteCodeParams>(),
        }
    }

    async fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> Result<Self::Output, Self::Error> {
        self.kernel.execute(&args.code, args.options).await
    }
}
