use crate::error::VigilError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned id; the matching [`ToolResult`] echoes it.
    pub id: String,
    pub name: String,
    /// Argument object exactly as the model sent it.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// `name {"arg":..}`, the form shown in verbose output.
impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.arguments)
    }
}

/// Outcome of a [`ToolCall`], fed back to the model as a `tool` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    /// Text handed to the model: JSON on success, a message on failure.
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Error result for a tool that ran and failed: `"Error: <err>"`.
    pub fn failed(call_id: impl Into<String>, err: &VigilError) -> Self {
        Self::error(call_id, format!("Error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_prefixes_error_text() {
        let err = VigilError::DataSource("HTTP 404 for chart 'bogus.series'".into());
        let result = ToolResult::failed("call_3", &err);
        assert!(result.is_error);
        assert_eq!(result.call_id, "call_3");
        assert_eq!(
            result.content,
            "Error: Data source error: HTTP 404 for chart 'bogus.series'"
        );
    }

    #[test]
    fn test_call_display() {
        let call = ToolCall::new("c1", "get_alarms", serde_json::json!({"all": true}));
        assert_eq!(call.to_string(), r#"get_alarms {"all":true}"#);
    }
}
