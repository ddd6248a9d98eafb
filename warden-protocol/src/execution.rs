//! What one sandbox call produced.

use serde::{Deserialize, Serialize};

use crate::time::DurationMs;

/// How a snippet is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    /// Run statements for their effects; bare expressions still render.
    #[default]
    Exec,
    /// The snippet must be a single expression; its value is the result.
    Eval,
}

/// Options for one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteOptions {
    /// Interpretation mode.
    #[serde(default)]
    pub mode: ExecMode,
    /// Whether stdout/stderr fragments are kept. Defaults to true.
    #[serde(default = "default_capture")]
    pub capture_output: bool,
    /// Per-call execution timeout. `None` means the session default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<DurationMs>,
}

fn default_capture() -> bool {
    true
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            mode: ExecMode::default(),
            capture_output: default_capture(),
            timeout: None,
        }
    }
}

/// One captured piece of execution output, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputFragment {
    /// A chunk of a named output stream.
    Stream {
        /// `stdout` or `stderr`.
        name: String,
        /// The captured text.
        text: String,
    },
    /// The rendered value of an expression statement.
    ExecuteResult {
        /// Plain-text rendering of the value.
        text: String,
        /// The execution counter at the time the value was produced.
        execution_count: u64,
    },
}

/// Description of an error raised during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionErrorDetails {
    /// Error class, e.g. `NameError` or `SyntaxError`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// 1-based line within the submitted snippet, where known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// The immutable record of one sandbox invocation.
///
/// Produced exactly once per `execute` call and never modified afterwards.
/// Failure is data here, not an `Err`: a snippet that raised still produces
/// a result, with `success == false` and `error` filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether every statement ran without raising.
    pub success: bool,
    /// The execution counter after this call.
    pub execution_count: u64,
    /// Captured output fragments, in order.
    pub outputs: Vec<OutputFragment>,
    /// Wall-clock duration of the call.
    pub duration: DurationMs,
    /// Names created or rebound by this call, in first-touch order.
    pub variables_changed: Vec<String>,
    /// The raised error, if any. Statements before the failing one keep
    /// their effects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionErrorDetails>,
}

impl ExecutionResult {
    /// Concatenated text of all stream fragments (test convenience).
    #[must_use]
    pub fn stream_text(&self) -> String {
        self.outputs
            .iter()
            .filter_map(|f| match f {
                OutputFragment::Stream { text, .. } => Some(text.as_str()),
                OutputFragment::ExecuteResult { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_mode_defaults_to_exec() {
        let opts: ExecuteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.mode, ExecMode::Exec);
        assert!(opts.capture_output);
        assert!(opts.timeout.is_none());
    }

    #[test]
    fn fragments_tag_by_type() {
        let f = OutputFragment::Stream {
            name: "stdout".into(),
            text: "hi\n".into(),
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "stream");
        assert_eq!(json["name"], "stdout");
    }

    #[test]
    fn stream_text_skips_results() {
        let r = ExecutionResult {
            success: true,
            execution_count: 1,
            outputs: vec![
                OutputFragment::Stream {
                    name: "stdout".into(),
                    text: "a".into(),
                },
                OutputFragment::ExecuteResult {
                    text: "42".into(),
                    execution_count: 1,
                },
                OutputFragment::Stream {
                    name: "stderr".into(),
                    text: "b".into(),
                },
            ],
            duration: DurationMs::ZERO,
            variables_changed: vec![],
            error: None,
        };
        assert_eq!(r.stream_text(), "ab");
    }
}
