//! Read-only views of the namespace: variable listings, inspection,
//! kernel status, and stack traces.

use serde::{Deserialize, Serialize};

/// Filter applied to a variable listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VariableFilter {
    /// Keep only variables whose type name is in this list. Empty = all.
    #[serde(default)]
    pub types: Vec<String>,
    /// Keep only names matching this regular expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Drop names starting with `_`. Defaults to true.
    #[serde(default = "default_exclude_private")]
    pub exclude_private: bool,
}

fn default_exclude_private() -> bool {
    true
}

impl Default for VariableFilter {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            pattern: None,
            exclude_private: default_exclude_private(),
        }
    }
}

/// Which key a variable listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Lexicographic by name.
    #[default]
    Name,
    /// Lexicographic by type name.
    Type,
    /// Numeric by rendered size.
    Size,
}

/// Ascending or descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Sort specification for a variable listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SortSpec {
    /// Sort key.
    #[serde(default)]
    pub by: SortBy,
    /// Sort direction.
    #[serde(default)]
    pub order: SortOrder,
}

/// What the namespace knows about one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDescription {
    /// The variable's name.
    pub name: String,
    /// Short type name (`int`, `str`, `list`, ...).
    pub type_name: String,
    /// Rendered size in bytes of the serialized value.
    pub size: usize,
    /// Truncated plain-text preview of the value.
    pub preview: String,
    /// Whether the value is callable. Always false for data values; kept
    /// on the wire because clients branch on it.
    pub is_callable: bool,
    /// Attribute/key names, populated only for deep inspection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    /// Full rendering of the value, populated only for deep inspection
    /// of values under the size bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Coarse kernel lifecycle state as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    /// Ready for the next call.
    Idle,
    /// An execution is in flight.
    Busy,
    /// Torn down; the session must be re-established.
    Dead,
}

/// A point-in-time summary of the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelInfo {
    /// Lifecycle state.
    pub status: KernelStatus,
    /// Language tag of the snippet grammar.
    pub language: String,
    /// How many `execute` calls have completed.
    pub execution_count: u64,
    /// Number of names in the namespace.
    pub namespace_size: usize,
}

/// One frame of the most recent execution error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Where the code came from. Snippets report `<session>`.
    pub filename: String,
    /// 1-based line number within the snippet.
    pub line_number: usize,
    /// Enclosing function; snippets report `<module>`.
    pub function_name: String,
    /// The source line, where known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Local bindings in scope, when requested. Snippets expose the
    /// whole namespace rendered to strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<std::collections::BTreeMap<String, String>>,
    /// Whether this is the innermost frame.
    pub is_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_exclude_private() {
        let f: VariableFilter = serde_json::from_str("{}").unwrap();
        assert!(f.exclude_private);
        assert!(f.types.is_empty());
        assert!(f.pattern.is_none());
    }

    #[test]
    fn sort_spec_defaults() {
        let s: SortSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(s.by, SortBy::Name);
        assert_eq!(s.order, SortOrder::Asc);
    }

    #[test]
    fn kernel_status_wire_spelling() {
        assert_eq!(serde_json::to_string(&KernelStatus::Idle).unwrap(), "\"idle\"");
        assert_eq!(serde_json::to_string(&KernelStatus::Dead).unwrap(), "\"dead\"");
    }
}
