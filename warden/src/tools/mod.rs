//! Built-in tools and the default registry.
//!
//! Classification follows one rule: anything that only reads — the
//! namespace, a file, a directory — is `Auto`; anything that mutates is
//! `RequiresApproval`.

pub mod fs;
pub mod kernel;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use warden_kernel::SharedKernel;
use warden_tool::{AccessClass, SchemaValidator, TimeoutMiddleware, ToolRegistry};

pub use fs::{
    CopyFileTool, DeleteFileTool, ListDirectoryTool, MoveFileTool, ReadFileTool, SearchFilesTool,
    WriteFileTool,
};
pub use kernel::{ExecuteCodeTool, GetVariablesTool, InspectVariableTool, KernelInfoTool};

/// Build the session's registry: every recognized tool, classified, with
/// schema validation and a per-call timeout in front.
///
/// File tools are only registered when a workspace root is configured;
/// the kernel tools are always present. The registry this returns is the
/// session's static snapshot — nothing registers later.
pub fn default_registry(kernel: SharedKernel, workspace_root: Option<PathBuf>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(GetVariablesTool::new(kernel.clone()), AccessClass::Auto);
    registry.register(InspectVariableTool::new(kernel.clone()), AccessClass::Auto);
    registry.register(KernelInfoTool::new(kernel.clone()), AccessClass::Auto);
    registry.register(
        ExecuteCodeTool::new(kernel),
        AccessClass::RequiresApproval,
    );

    if let Some(root) = workspace_root {
        let root = Arc::new(root);
        registry.register(ReadFileTool::new(Arc::clone(&root)), AccessClass::Auto);
        registry.register(ListDirectoryTool::new(Arc::clone(&root)), AccessClass::Auto);
        registry.register(SearchFilesTool::new(Arc::clone(&root)), AccessClass::Auto);
        registry.register(
            WriteFileTool::new(Arc::clone(&root)),
            AccessClass::RequiresApproval,
        );
        registry.register(
            DeleteFileTool::new(Arc::clone(&root)),
            AccessClass::RequiresApproval,
        );
        registry.register(
            MoveFileTool::new(Arc::clone(&root)),
            AccessClass::RequiresApproval,
        );
        registry.register(CopyFileTool::new(root), AccessClass::RequiresApproval);
    }

    let validator = SchemaValidator::new(&registry);
    registry.add_middleware(TimeoutMiddleware::new(Duration::from_secs(60)));
    registry.add_middleware(validator);
    registry
}
