//! The in-process kernel: one namespace, one interpreter, no locks.
//!
//! [`LocalKernel`] is deliberately plain synchronous state. Serialization
//! of callers is the [`SharedKernel`](crate::SharedKernel) wrapper's job;
//! nothing here is thread-aware.

use std::collections::BTreeMap;
use std::time::Instant;

use regex::Regex;
use serde_json::Value;

use warden_protocol::execution::ExecutionErrorDetails;
use warden_protocol::{
    DurationMs, ExecMode, ExecuteOptions, ExecutionResult, KernelError, KernelInfo, KernelStatus,
    OutputFragment, StackFrame, ValueDescription, VariableFilter,
};

use crate::interp::{self, StmtKind};

/// Tunables for a [`LocalKernel`].
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Preview truncation length in characters.
    pub preview_len: usize,
    /// Deep inspection refuses values rendering larger than this.
    pub max_value_bytes: usize,
    /// Execution timeout applied when a call doesn't bring its own.
    pub default_timeout: DurationMs,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            preview_len: 100,
            max_value_bytes: 1024 * 1024,
            default_timeout: DurationMs::from_secs(30),
        }
    }
}

/// The most recent execution error, kept for `get_stack_trace`.
#[derive(Debug, Clone)]
struct LastError {
    details: ExecutionErrorDetails,
    source_line: Option<String>,
}

/// The single mutable namespace and the machinery that runs snippets
/// against it.
pub struct LocalKernel {
    namespace: BTreeMap<String, Value>,
    execution_count: u64,
    last_error: Option<LastError>,
    config: KernelConfig,
}

impl LocalKernel {
    /// An empty kernel with default configuration.
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// An empty kernel with the given configuration.
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            namespace: BTreeMap::new(),
            execution_count: 0,
            last_error: None,
            config,
        }
    }

    /// Run one snippet. Failure is captured in the result, never returned
    /// as an error; the namespace keeps the effects of every statement
    /// that completed before the failing one.
    pub fn execute(&mut self, code: &str, opts: &ExecuteOptions) -> ExecutionResult {
        let started = Instant::now();
        self.execution_count += 1;
        let count = self.execution_count;

        let deadline = opts
            .timeout
            .unwrap_or(self.config.default_timeout)
            .to_std();

        let mut outputs = Vec::new();
        let mut changed: Vec<String> = Vec::new();
        let mut error: Option<ExecutionErrorDetails> = None;

        match opts.mode {
            ExecMode::Eval => match interp::parse_expression(code) {
                Ok(expr) => match interp::eval(&expr, &self.namespace) {
                    Ok(value) => outputs.push(OutputFragment::ExecuteResult {
                        text: interp::render(&value),
                        execution_count: count,
                    }),
                    Err(e) => {
                        error = Some(self.record_error(e.kind, e.message, Some(1), code));
                    }
                },
                Err(e) => {
                    error = Some(self.record_error("SyntaxError", e.message, Some(e.line), code));
                }
            },
            ExecMode::Exec => match interp::parse(code) {
                Ok(stmts) => {
                    for stmt in stmts {
                        if started.elapsed() >= deadline {
                            error = Some(self.record_error(
                                "TimeoutError",
                                format!(
                                    "execution exceeded {}ms",
                                    deadline.as_millis()
                                ),
                                Some(stmt.line),
                                code,
                            ));
                            break;
                        }
                        match self.run_statement(&stmt.kind, count, opts.capture_output, &mut outputs)
                        {
                            Ok(touched) => {
                                if let Some(name) = touched {
                                    if !changed.contains(&name) {
                                        changed.push(name);
                                    }
                                }
                            }
                            Err(e) => {
                                error = Some(self.record_error(
                                    e.kind,
                                    e.message,
                                    Some(stmt.line),
                                    code,
                                ));
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error = Some(self.record_error("SyntaxError", e.message, Some(e.line), code));
                }
            },
        }

        let success = error.is_none();
        if success {
            self.last_error = None;
        }
        tracing::debug!(
            execution_count = count,
            success,
            changed = changed.len(),
            "snippet executed"
        );

        ExecutionResult {
            success,
            execution_count: count,
            outputs,
            duration: started.elapsed().into(),
            variables_changed: changed,
            error,
        }
    }

    fn run_statement(
        &mut self,
        kind: &StmtKind,
        count: u64,
        capture: bool,
        outputs: &mut Vec<OutputFragment>,
    ) -> Result<Option<String>, crate::interp::EvalError> {
        match kind {
            StmtKind::Assign(name, expr) => {
                let value = interp::eval(expr, &self.namespace)?;
                self.namespace.insert(name.clone(), value);
                Ok(Some(name.clone()))
            }
            StmtKind::Delete(name) => {
                if self.namespace.remove(name).is_none() {
                    return Err(crate::interp::EvalError {
                        kind: "NameError",
                        message: format!("name '{name}' is not defined"),
                    });
                }
                Ok(Some(name.clone()))
            }
            StmtKind::Print(expr) => {
                let value = interp::eval(expr, &self.namespace)?;
                if capture {
                    outputs.push(OutputFragment::Stream {
                        name: "stdout".into(),
                        text: format!("{}\n", interp::render_for_print(&value)),
                    });
                }
                Ok(None)
            }
            StmtKind::Expr(expr) => {
                let value = interp::eval(expr, &self.namespace)?;
                if capture {
                    outputs.push(OutputFragment::ExecuteResult {
                        text: interp::render(&value),
                        execution_count: count,
                    });
                }
                Ok(None)
            }
        }
    }

    fn record_error(
        &mut self,
        kind: &str,
        message: String,
        line: Option<usize>,
        code: &str,
    ) -> ExecutionErrorDetails {
        let details = ExecutionErrorDetails {
            kind: kind.to_string(),
            message,
            line,
        };
        let source_line =
            line.and_then(|n| code.lines().nth(n.saturating_sub(1)).map(str::to_string));
        self.last_error = Some(LastError {
            details: details.clone(),
            source_line,
        });
        details
    }

    /// Describe one variable, or report it missing. Deep inspection adds
    /// attribute names and the full value, refusing oversized values.
    pub fn inspect(&self, name: &str, deep: bool) -> Result<ValueDescription, KernelError> {
        let value = self
            .namespace
            .get(name)
            .ok_or_else(|| KernelError::VariableNotFound(name.to_string()))?;

        let mut desc = self.describe(name, value);
        if deep {
            if desc.size > self.config.max_value_bytes {
                return Err(KernelError::VariableTooLarge {
                    name: name.to_string(),
                    size: desc.size,
                });
            }
            if let Value::Object(map) = value {
                desc.attributes = map.keys().take(50).cloned().collect();
            }
            desc.value = Some(value.clone());
        }
        Ok(desc)
    }

    /// List variables matching the filter, plus the unfiltered namespace
    /// size. Listing order is name order; callers re-sort as requested.
    pub fn list(
        &self,
        filter: &VariableFilter,
    ) -> Result<(Vec<ValueDescription>, usize), KernelError> {
        let pattern = match &filter.pattern {
            Some(p) => Some(
                Regex::new(p)
                    .map_err(|e| KernelError::Execution(format!("invalid pattern: {e}")))?,
            ),
            None => None,
        };

        let mut out = Vec::new();
        for (name, value) in &self.namespace {
            if filter.exclude_private && name.starts_with('_') {
                continue;
            }
            if let Some(re) = &pattern {
                if !re.is_match(name) {
                    continue;
                }
            }
            let desc = self.describe(name, value);
            if !filter.types.is_empty() && !filter.types.contains(&desc.type_name) {
                continue;
            }
            out.push(desc);
        }
        Ok((out, self.namespace.len()))
    }

    fn describe(&self, name: &str, value: &Value) -> ValueDescription {
        let rendered = interp::render(value);
        let size = rendered.len();
        let preview = if rendered.chars().count() > self.config.preview_len {
            let cut: String = rendered.chars().take(self.config.preview_len).collect();
            format!("{cut}...")
        } else {
            rendered
        };
        ValueDescription {
            name: name.to_string(),
            type_name: crate::interp::json_type_name(value).to_string(),
            size,
            preview,
            is_callable: false,
            attributes: Vec::new(),
            value: None,
        }
    }

    /// Point-in-time kernel summary.
    pub fn info(&self) -> KernelInfo {
        KernelInfo {
            status: KernelStatus::Idle,
            language: "warden-script".to_string(),
            execution_count: self.execution_count,
            namespace_size: self.namespace.len(),
        }
    }

    /// The most recent execution error, if the last execution failed.
    pub fn last_error(&self) -> Option<ExecutionErrorDetails> {
        self.last_error.as_ref().map(|e| e.details.clone())
    }

    /// Frames describing the most recent execution error. Snippets have a
    /// single frame; `max_frames == 0` yields none.
    pub fn stack_trace(&self, include_locals: bool, max_frames: usize) -> Vec<StackFrame> {
        let Some(last) = &self.last_error else {
            return Vec::new();
        };
        if max_frames == 0 {
            return Vec::new();
        }
        let locals = include_locals.then(|| {
            self.namespace
                .iter()
                .map(|(k, v)| (k.clone(), interp::render(v)))
                .collect()
        });
        vec![StackFrame {
            filename: "<session>".to_string(),
            line_number: last.details.line.unwrap_or(1),
            function_name: "<module>".to_string(),
            source: last.source_line.clone(),
            locals,
            is_current: true,
        }]
    }
}

impl Default for LocalKernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exec(kernel: &mut LocalKernel, code: &str) -> ExecutionResult {
        kernel.execute(code, &ExecuteOptions::default())
    }

    #[test]
    fn assignment_lands_in_namespace() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "x = 1");
        assert!(r.success);
        assert_eq!(r.variables_changed, vec!["x"]);
        assert_eq!(k.inspect("x", true).unwrap().value, Some(json!(1)));
    }

    #[test]
    fn execution_count_increments_even_on_failure() {
        let mut k = LocalKernel::new();
        assert_eq!(exec(&mut k, "x = 1").execution_count, 1);
        assert_eq!(exec(&mut k, "y = nope").execution_count, 2);
        assert_eq!(exec(&mut k, "z = 2").execution_count, 3);
    }

    #[test]
    fn failing_statement_keeps_earlier_effects() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "a = 1\nb = missing\nc = 3");
        assert!(!r.success);
        let err = r.error.unwrap();
        assert_eq!(err.kind, "NameError");
        assert_eq!(err.line, Some(2));
        assert!(k.inspect("a", false).is_ok());
        assert!(matches!(
            k.inspect("c", false),
            Err(KernelError::VariableNotFound(_))
        ));
    }

    #[test]
    fn syntax_error_has_no_effects() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "a = 1\nb = = 2");
        assert!(!r.success);
        assert_eq!(r.error.unwrap().kind, "SyntaxError");
        assert!(matches!(
            k.inspect("a", false),
            Err(KernelError::VariableNotFound(_))
        ));
    }

    #[test]
    fn print_captures_stdout_in_order() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "print('one')\nprint('two')");
        assert!(r.success);
        assert_eq!(r.stream_text(), "one\ntwo\n");
    }

    #[test]
    fn capture_disabled_drops_fragments() {
        let mut k = LocalKernel::new();
        let opts = ExecuteOptions {
            capture_output: false,
            ..Default::default()
        };
        let r = k.execute("print('quiet')\n1 + 1", &opts);
        assert!(r.success);
        assert!(r.outputs.is_empty());
    }

    #[test]
    fn bare_expression_yields_execute_result() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "x = 2\nx * 21");
        assert_eq!(
            r.outputs,
            vec![OutputFragment::ExecuteResult {
                text: "42".into(),
                execution_count: 1,
            }]
        );
    }

    #[test]
    fn eval_mode_returns_value() {
        let mut k = LocalKernel::new();
        exec(&mut k, "x = 20");
        let opts = ExecuteOptions {
            mode: ExecMode::Eval,
            ..Default::default()
        };
        let r = k.execute("x * 2 + 2", &opts);
        assert!(r.success);
        assert_eq!(
            r.outputs,
            vec![OutputFragment::ExecuteResult {
                text: "42".into(),
                execution_count: 2,
            }]
        );
    }

    #[test]
    fn zero_timeout_reports_timeout_error() {
        let mut k = LocalKernel::new();
        let opts = ExecuteOptions {
            timeout: Some(DurationMs::ZERO),
            ..Default::default()
        };
        let r = k.execute("x = 1", &opts);
        assert!(!r.success);
        assert_eq!(r.error.unwrap().kind, "TimeoutError");
        assert!(matches!(
            k.inspect("x", false),
            Err(KernelError::VariableNotFound(_))
        ));
    }

    #[test]
    fn del_removes_and_reports() {
        let mut k = LocalKernel::new();
        exec(&mut k, "x = 1");
        let r = exec(&mut k, "del x");
        assert!(r.success);
        assert_eq!(r.variables_changed, vec!["x"]);
        assert!(matches!(
            k.inspect("x", false),
            Err(KernelError::VariableNotFound(_))
        ));
    }

    #[test]
    fn del_unknown_name_raises() {
        let mut k = LocalKernel::new();
        let r = exec(&mut k, "del ghost");
        assert!(!r.success);
        assert_eq!(r.error.unwrap().kind, "NameError");
    }

    #[test]
    fn list_filters_private_and_pattern_and_types() {
        let mut k = LocalKernel::new();
        exec(&mut k, "_hidden = 1\nalpha = 1\nbeta = 'two'\ngamma = [3]");
        let (all, total) = k.list(&VariableFilter::default()).unwrap();
        assert_eq!(total, 4);
        let names: Vec<_> = all.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);

        let (ints, _) = k
            .list(&VariableFilter {
                types: vec!["int".into()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ints.len(), 1);
        assert_eq!(ints[0].name, "alpha");

        let (matched, _) = k
            .list(&VariableFilter {
                pattern: Some("^be".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "beta");
    }

    #[test]
    fn preview_truncates_long_values() {
        let mut k = LocalKernel::with_config(KernelConfig {
            preview_len: 10,
            ..Default::default()
        });
        exec(&mut k, "s = 'aaaaaaaaaaaaaaaaaaaaaaaa'");
        let desc = k.inspect("s", false).unwrap();
        assert!(desc.preview.ends_with("..."));
        assert_eq!(desc.preview.chars().count(), 13);
    }

    #[test]
    fn deep_inspect_refuses_oversized_values() {
        let mut k = LocalKernel::with_config(KernelConfig {
            max_value_bytes: 8,
            ..Default::default()
        });
        exec(&mut k, "big = 'aaaaaaaaaaaaaaaa'");
        assert!(k.inspect("big", false).is_ok());
        assert!(matches!(
            k.inspect("big", true),
            Err(KernelError::VariableTooLarge { .. })
        ));
    }

    #[test]
    fn deep_inspect_lists_dict_keys() {
        let mut k = LocalKernel::new();
        exec(&mut k, "d = {\"a\": 1, \"b\": 2}");
        let desc = k.inspect("d", true).unwrap();
        assert_eq!(desc.attributes, vec!["a", "b"]);
        assert_eq!(desc.type_name, "dict");
    }

    #[test]
    fn stack_trace_reflects_last_error() {
        let mut k = LocalKernel::new();
        exec(&mut k, "x = 1");
        assert!(k.stack_trace(false, 10).is_empty());

        exec(&mut k, "y = boom");
        let frames = k.stack_trace(true, 10);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].line_number, 1);
        assert_eq!(frames[0].source.as_deref(), Some("y = boom"));
        assert!(frames[0].locals.as_ref().unwrap().contains_key("x"));

        // A later success clears the record.
        exec(&mut k, "z = 1");
        assert!(k.stack_trace(false, 10).is_empty());
        assert!(k.last_error().is_none());
    }

    #[test]
    fn info_counts_names_and_executions() {
        let mut k = LocalKernel::new();
        exec(&mut k, "a = 1\nb = 2");
        let info = k.info();
        assert_eq!(info.status, KernelStatus::Idle);
        assert_eq!(info.execution_count, 1);
        assert_eq!(info.namespace_size, 2);
    }
}
