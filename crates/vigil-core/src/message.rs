use crate::tool::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// A system-level instruction or prompt.
    System,
    /// Output produced by a tool invocation.
    Tool,
}

impl Role {
    /// Lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// A single message exchanged within a conversation session.
///
/// Messages are immutable once appended to a session. An assistant message
/// may carry tool call requests and empty content; a tool message carries the
/// id of the call it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
    /// The session this message belongs to.
    pub session_id: Uuid,
    /// Tool invocations requested by the assistant, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For [`Role::Tool`] messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For [`Role::Tool`] messages: whether the invocation failed.
    #[serde(default)]
    pub is_error: bool,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary key-value metadata attached to the message.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    /// Creates a new message with the given role, content, and session ID.
    pub fn new(role: Role, content: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            session_id,
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>, session_id: Uuid) -> Self {
        Self::new(Role::User, content, session_id)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>, session_id: Uuid) -> Self {
        Self::new(Role::Assistant, content, session_id)
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>, session_id: Uuid) -> Self {
        Self::new(Role::System, content, session_id)
    }

    /// Creates an assistant message that requests tool invocations.
    pub fn assistant_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        session_id: Uuid,
    ) -> Self {
        let mut msg = Self::new(Role::Assistant, content, session_id);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Creates a [`Role::Tool`] message carrying a tool result.
    pub fn tool_result(result: ToolResult, session_id: Uuid) -> Self {
        let mut msg = Self::new(Role::Tool, result.content, session_id);
        msg.tool_call_id = Some(result.call_id);
        msg.is_error = result.is_error;
        msg
    }

    /// Whether this message asks for at least one tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let session_id = Uuid::new_v4();
        let msg = Message::user("Hello", session_id);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert_eq!(msg.session_id, session_id);
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_tool_result_message_keeps_call_id() {
        let sid = Uuid::new_v4();
        let msg = Message::tool_result(ToolResult::error("call_7", "key not found"), sid);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
        assert!(msg.is_error);
        assert_eq!(msg.content, "key not found");
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let sid = Uuid::new_v4();
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_info".into(),
            arguments: serde_json::json!({"netdata_host_url": "http://localhost:19999"}),
        };
        let msg = Message::assistant_tool_calls("", vec![call], sid);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"tool_calls\""));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_calls.len(), 1);
        assert_eq!(back.tool_calls[0].name, "get_info");
        assert!(back.content.is_empty());
    }

    #[test]
    fn test_plain_message_omits_tool_fields() {
        let msg = Message::assistant("hi", Uuid::new_v4());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }
}
