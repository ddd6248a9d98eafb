//! File tools rooted in the session workspace directory.
//!
//! Reads are `Auto`; writes, deletes, moves, and copies are
//! `RequiresApproval`. Every path is resolved relative to the workspace
//! root and may not escape it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use regex::RegexBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use warden_protocol::ToolError;
use warden_tool::{Tool, ToolContext, ToolDefinition};

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Resolve a user-supplied path against the workspace root, rejecting
/// absolute paths and parent traversal.
fn resolve(root: &Path, path: &str) -> Result<PathBuf, ToolError> {
    let rel = Path::new(path);
    if rel.is_absolute() {
        return Err(ToolError::InvalidInput(format!(
            "absolute paths are not allowed: {path}"
        )));
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(ToolError::InvalidInput(format!(
                    "path escapes the workspace root: {path}"
                )));
            }
        }
    }
    Ok(root.join(rel))
}

fn io_failed(op: &str, path: &Path, e: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed(Box::new(std::io::Error::new(
        e.kind(),
        format!("{op} {}: {e}", path.display()),
    )))
}

// ---------------------------------------------------------------------------
// read_file

/// Arguments for `read_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Workspace-relative path.
    pub path: String,
}

/// Output of `read_file`.
#[derive(Debug, Serialize)]
pub struct ReadFileOutput {
    /// The path that was read.
    pub path: String,
    /// File contents (UTF-8).
    pub content: String,
    /// Content length in bytes.
    pub size: usize,
}

/// Read a UTF-8 file inside the workspace.
pub struct ReadFileTool {
    root: Arc<PathBuf>,
}

impl ReadFileTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for ReadFileTool {
    const NAME: &'static str = "read_file";
    type Args = ReadFileArgs;
    type Output = ReadFileOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Read a file from the session workspace".into(),
            input_schema: schema_of::<ReadFileArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let full = resolve(&self.root, &args.path)?;
        let content = tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| io_failed("read", &full, e))?;
        Ok(ReadFileOutput {
            path: args.path,
            size: content.len(),
            content,
        })
    }
}

// ---------------------------------------------------------------------------
// list_directory

/// Arguments for `list_directory`.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListDirectoryArgs {
    /// Workspace-relative directory; defaults to the root.
    #[serde(default)]
    pub path: Option<String>,
}

/// One directory entry.
#[derive(Debug, Serialize)]
pub struct DirEntryInfo {
    /// Entry name.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// File size in bytes (0 for directories).
    pub size: u64,
}

/// Output of `list_directory`.
#[derive(Debug, Serialize)]
pub struct ListDirectoryOutput {
    /// The listed directory.
    pub path: String,
    /// Entries, sorted by name.
    pub entries: Vec<DirEntryInfo>,
}

/// List a directory inside the workspace.
pub struct ListDirectoryTool {
    root: Arc<PathBuf>,
}

impl ListDirectoryTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for ListDirectoryTool {
    const NAME: &'static str = "list_directory";
    type Args = ListDirectoryArgs;
    type Output = ListDirectoryOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "List a directory in the session workspace".into(),
            input_schema: schema_of::<ListDirectoryArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let rel = args.path.unwrap_or_else(|| ".".to_string());
        let full = resolve(&self.root, &rel)?;
        let mut reader = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| io_failed("list", &full, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_failed("list", &full, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| io_failed("stat", &entry.path(), e))?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ListDirectoryOutput { path: rel, entries })
    }
}

// ---------------------------------------------------------------------------
// search_files

/// Arguments for `search_files`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchFilesArgs {
    /// Regular expression to search for.
    pub pattern: String,
    /// Workspace-relative directory to search under; defaults to the root.
    #[serde(default)]
    pub path: Option<String>,
    /// Case-sensitive matching. Defaults to false.
    #[serde(default)]
    pub case_sensitive: bool,
}

/// One matching line.
#[derive(Debug, Serialize)]
pub struct SearchMatch {
    /// Workspace-relative path of the file.
    pub path: String,
    /// 1-based line number.
    pub line_number: usize,
    /// The matching line.
    pub line: String,
}

/// Output of `search_files`.
#[derive(Debug, Serialize)]
pub struct SearchFilesOutput {
    /// Matches, in traversal order, capped.
    pub matches: Vec<SearchMatch>,
    /// True when the cap cut the result off.
    pub truncated: bool,
}

/// Search file contents under the workspace.
pub struct SearchFilesTool {
    root: Arc<PathBuf>,
}

impl SearchFilesTool {
    const MAX_MATCHES: usize = 100;

    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for SearchFilesTool {
    const NAME: &'static str = "search_files";
    type Args = SearchFilesArgs;
    type Output = SearchFilesOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Search file contents in the session workspace with a regular \
                          expression"
                .into(),
            input_schema: schema_of::<SearchFilesArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let regex = RegexBuilder::new(&args.pattern)
            .case_insensitive(!args.case_sensitive)
            .build()
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern: {e}")))?;

        let rel = args.path.unwrap_or_else(|| ".".to_string());
        let start = resolve(&self.root, &rel)?;

        let mut matches = Vec::new();
        let mut truncated = false;
        let mut stack = vec![start];

        while let Some(dir) = stack.pop() {
            let mut reader = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| io_failed("search", &dir, e))?;
            while let Some(entry) = reader
                .next_entry()
                .await
                .map_err(|e| io_failed("search", &dir, e))?
            {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                // Binary or unreadable files are skipped, not errors.
                let Ok(content) = tokio::fs::read_to_string(&path).await else {
                    continue;
                };
                let display = path
                    .strip_prefix(self.root.as_path())
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        if matches.len() >= Self::MAX_MATCHES {
                            truncated = true;
                            break;
                        }
                        matches.push(SearchMatch {
                            path: display.clone(),
                            line_number: idx + 1,
                            line: line.to_string(),
                        });
                    }
                }
                if truncated {
                    break;
                }
            }
            if truncated {
                break;
            }
        }

        Ok(SearchFilesOutput { matches, truncated })
    }
}

// ---------------------------------------------------------------------------
// write_file

/// Arguments for `write_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Workspace-relative path.
    pub path: String,
    /// Content to write (replaces any existing content).
    pub content: String,
}

/// Output of `write_file`.
#[derive(Debug, Serialize)]
pub struct WriteFileOutput {
    /// The path that was written.
    pub path: String,
    /// Bytes written.
    pub bytes_written: usize,
}

/// Write a file inside the workspace. Gated.
pub struct WriteFileTool {
    root: Arc<PathBuf>,
}

impl WriteFileTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for WriteFileTool {
    const NAME: &'static str = "write_file";
    type Args = WriteFileArgs;
    type Output = WriteFileOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Write a file in the session workspace (requires approval)".into(),
            input_schema: schema_of::<WriteFileArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let full = resolve(&self.root, &args.path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failed("create parent of", &full, e))?;
        }
        tokio::fs::write(&full, args.content.as_bytes())
            .await
            .map_err(|e| io_failed("write", &full, e))?;
        Ok(WriteFileOutput {
            path: args.path,
            bytes_written: args.content.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// delete_file

/// Arguments for `delete_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteFileArgs {
    /// Workspace-relative path.
    pub path: String,
}

/// Output of `delete_file`.
#[derive(Debug, Serialize)]
pub struct DeleteFileOutput {
    /// The path that was removed.
    pub path: String,
}

/// Delete a file inside the workspace. Gated.
pub struct DeleteFileTool {
    root: Arc<PathBuf>,
}

impl DeleteFileTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for DeleteFileTool {
    const NAME: &'static str = "delete_file";
    type Args = DeleteFileArgs;
    type Output = DeleteFileOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Delete a file in the session workspace (requires approval)".into(),
            input_schema: schema_of::<DeleteFileArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let full = resolve(&self.root, &args.path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| io_failed("delete", &full, e))?;
        Ok(DeleteFileOutput { path: args.path })
    }
}

// ---------------------------------------------------------------------------
// move_file

/// Arguments for `move_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MoveFileArgs {
    /// Workspace-relative source path.
    pub src: String,
    /// Workspace-relative destination path.
    pub dest: String,
}

/// Output of `move_file`.
#[derive(Debug, Serialize)]
pub struct MoveFileOutput {
    /// Source path.
    pub src: String,
    /// Destination path.
    pub dest: String,
}

/// Move/rename a file inside the workspace. Gated.
pub struct MoveFileTool {
    root: Arc<PathBuf>,
}

impl MoveFileTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for MoveFileTool {
    const NAME: &'static str = "move_file";
    type Args = MoveFileArgs;
    type Output = MoveFileOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Move or rename a file in the session workspace (requires approval)"
                .into(),
            input_schema: schema_of::<MoveFileArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let src = resolve(&self.root, &args.src)?;
        let dest = resolve(&self.root, &args.dest)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failed("create parent of", &dest, e))?;
        }
        tokio::fs::rename(&src, &dest)
            .await
            .map_err(|e| io_failed("move", &src, e))?;
        Ok(MoveFileOutput {
            src: args.src,
            dest: args.dest,
        })
    }
}

// ---------------------------------------------------------------------------
// copy_file

/// Arguments for `copy_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CopyFileArgs {
    /// Workspace-relative source path.
    pub src: String,
    /// Workspace-relative destination path.
    pub dest: String,
}

/// Output of `copy_file`.
#[derive(Debug, Serialize)]
pub struct CopyFileOutput {
    /// Source path.
    pub src: String,
    /// Destination path.
    pub dest: String,
    /// Bytes copied.
    pub bytes_copied: u64,
}

/// Copy a file inside the workspace. Gated.
pub struct CopyFileTool {
    root: Arc<PathBuf>,
}

impl CopyFileTool {
    /// Bind the tool to a workspace root.
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }
}

impl Tool for CopyFileTool {
    const NAME: &'static str = "copy_file";
    type Args = CopyFileArgs;
    type Output = CopyFileOutput;
    type Error = ToolError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Copy a file in the session workspace (requires approval)".into(),
            input_schema: schema_of::<CopyFileArgs>(),
        }
    }

    async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
        let src = resolve(&self.root, &args.src)?;
        let dest = resolve(&self.root, &args.dest)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failed("create parent of", &dest, e))?;
        }
        let bytes_copied = tokio::fs::copy(&src, &dest)
            .await
            .map_err(|e| io_failed("copy", &src, e))?;
        Ok(CopyFileOutput {
            src: args.src,
            dest: args.dest,
            bytes_copied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_tool::{AccessClass, ToolCall, ToolRegistry};

    fn workspace() -> (tempfile::TempDir, Arc<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let root = Arc::new(dir.path().to_path_buf());
        (dir, root)
    }

    fn registry(root: &Arc<PathBuf>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(ReadFileTool::new(Arc::clone(root)), AccessClass::Auto);
        registry.register(ListDirectoryTool::new(Arc::clone(root)), AccessClass::Auto);
        registry.register(SearchFilesTool::new(Arc::clone(root)), AccessClass::Auto);
        registry.register(
            WriteFileTool::new(Arc::clone(root)),
            AccessClass::RequiresApproval,
        );
        registry.register(
            DeleteFileTool::new(Arc::clone(root)),
            AccessClass::RequiresApproval,
        );
        registry.register(
            MoveFileTool::new(Arc::clone(root)),
            AccessClass::RequiresApproval,
        );
        registry.register(
            CopyFileTool::new(Arc::clone(root)),
            AccessClass::RequiresApproval,
        );
        registry
    }

    fn ctx() -> ToolContext {
        ToolContext::new("s-fs")
    }

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "t".into(),
            name: name.into(),
            input,
        }
    }

    #[tokio::test]
    async fn write_read_roundtrip() {
        let (_dir, root) = workspace();
        let registry = registry(&root);

        let out = registry
            .execute(
                &call("write_file", json!({"path": "notes/a.txt", "content": "hello"})),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["bytes_written"], 5);

        let out = registry
            .execute(&call("read_file", json!({"path": "notes/a.txt"})), &ctx())
            .await
            .unwrap();
        assert_eq!(out["content"], "hello");
    }

    #[tokio::test]
    async fn list_directory_sorts_entries() {
        let (_dir, root) = workspace();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        let registry = registry(&root);

        let out = registry
            .execute(&call("list_directory", json!({})), &ctx())
            .await
            .unwrap();
        let names: Vec<_> = out["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(out["entries"][2]["is_dir"], true);
    }

    #[tokio::test]
    async fn search_finds_lines_case_insensitively() {
        let (_dir, root) = workspace();
        std::fs::create_dir(root.join("src")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "fn main() {}\n// TODO later\n").unwrap();
        let registry = registry(&root);

        let out = registry
            .execute(&call("search_files", json!({"pattern": "todo"})), &ctx())
            .await
            .unwrap();
        let matches = out["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["line_number"], 2);
        assert_eq!(out["truncated"], false);
    }

    #[tokio::test]
    async fn move_and_copy_and_delete() {
        let (_dir, root) = workspace();
        std::fs::write(root.join("a.txt"), "data").unwrap();
        let registry = registry(&root);

        registry
            .execute(
                &call("copy_file", json!({"src": "a.txt", "dest": "b.txt"})),
                &ctx(),
            )
            .await
            .unwrap();
        registry
            .execute(
                &call("move_file", json!({"src": "a.txt", "dest": "c.txt"})),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(!root.join("a.txt").exists());
        assert!(root.join("b.txt").exists());
        assert!(root.join("c.txt").exists());

        registry
            .execute(&call("delete_file", json!({"path": "b.txt"})), &ctx())
            .await
            .unwrap();
        assert!(!root.join("b.txt").exists());
    }

    #[tokio::test]
    async fn paths_may_not_escape_the_workspace() {
        let (_dir, root) = workspace();
        let registry = registry(&root);

        for path in ["../etc/passwd", "/etc/passwd", "a/../../b"] {
            let err = registry
                .execute(&call("read_file", json!({"path": path})), &ctx())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidInput(_)),
                "path {path} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn read_missing_file_is_execution_failure() {
        let (_dir, root) = workspace();
        let registry = registry(&root);
        let err = registry
            .execute(&call("read_file", json!({"path": "ghost.txt"})), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
