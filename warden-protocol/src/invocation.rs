//! The unit of work the reasoning layer hands to the gateway.

use serde::{Deserialize, Serialize};

use crate::id::RequestId;

/// A proposed tool call.
///
/// Produced by the reasoning layer (or synthesized by the session service
/// for wire requests like `execute_code`), consumed by the classification
/// gateway. Two invocations with identical name and arguments are still two
/// invocations: nothing upstream may deduplicate them, because repeated
/// calls can have distinct side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Registry name of the tool.
    pub tool_name: String,
    /// JSON arguments for the tool.
    pub arguments: serde_json::Value,
    /// The wire request this invocation answers, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request_id: Option<RequestId>,
}

impl ToolInvocation {
    /// Create an invocation with no originating request.
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            origin_request_id: None,
        }
    }

    /// Attach the originating wire request id.
    #[must_use]
    pub fn with_origin(mut self, id: RequestId) -> Self {
        self.origin_request_id = Some(id);
        self
    }

    /// One-line human-readable rendering for approval prompts.
    #[must_use]
    pub fn describe(&self) -> String {
        match serde_json::to_string(&self.arguments) {
            Ok(args) if args != "null" && args != "{}" => {
                format!("{} {}", self.tool_name, args)
            }
            _ => self.tool_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_includes_arguments() {
        let inv = ToolInvocation::new("execute_code", json!({"code": "x = 1"}));
        assert_eq!(inv.describe(), r#"execute_code {"code":"x = 1"}"#);
    }

    #[test]
    fn describe_omits_empty_arguments() {
        let inv = ToolInvocation::new("kernel_info", json!({}));
        assert_eq!(inv.describe(), "kernel_info");
    }
}
