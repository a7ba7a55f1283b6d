use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use vigil_core::{Message, Role};

/// One conversation: the model it talks to, its system prompt and the
/// append-only message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub model_id: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Session {
    pub fn new(model_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            model_id: model_id.into(),
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// A fresh session with the same model and prompt.
    pub fn renewed(&self) -> Self {
        Self::new(self.model_id.clone(), self.system_prompt.clone())
    }

    pub fn add_message(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Append several messages in one step.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.updated_at = Utc::now();
        self.messages.extend(messages);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool call ids requested by assistant messages that have no matching
    /// tool message after them.
    pub fn unanswered_calls(&self) -> Vec<String> {
        let mut pending: Vec<String> = Vec::new();
        for message in &self.messages {
            match message.role {
                Role::Assistant => {
                    pending.extend(message.tool_calls.iter().map(|c| c.id.clone()));
                }
                Role::Tool => {
                    if let Some(id) = &message.tool_call_id {
                        pending.retain(|p| p != id);
                    }
                }
                Role::User | Role::System => {}
            }
        }
        pending
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vigil_core::{ToolCall, ToolResult};

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "get_info".to_string(),
            arguments: serde_json::json!({}),
        }
    }

    #[test]
    fn test_add_message_updates_timestamp() {
        let mut session = Session::new("gpt-4o-mini", "You are helpful.");
        let before = session.updated_at;
        session.add_message(Message::user("hi", session.id));
        assert_eq!(session.message_count(), 1);
        assert!(session.updated_at >= before);
        assert_eq!(session.last_message().unwrap().content, "hi");
    }

    #[test]
    fn test_renewed_keeps_config_only() {
        let mut session = Session::new("gpt-4o-mini", "prompt");
        session.add_message(Message::user("hi", session.id));
        let fresh = session.renewed();
        assert_ne!(fresh.id, session.id);
        assert_eq!(fresh.model_id, "gpt-4o-mini");
        assert_eq!(fresh.system_prompt, "prompt");
        assert_eq!(fresh.message_count(), 0);
    }

    #[test]
    fn test_unanswered_calls() {
        let mut session = Session::new("m", "p");
        let sid = session.id;
        session.extend([
            Message::user("q", sid),
            Message::assistant_tool_calls("", vec![call("a"), call("b")], sid),
            Message::tool_result(ToolResult::success("a", "{}"), sid),
        ]);
        assert_eq!(session.unanswered_calls(), vec!["b".to_string()]);

        session.add_message(Message::tool_result(ToolResult::error("b", "boom"), sid));
        assert!(session.unanswered_calls().is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut session = Session::new("m", "p");
        session.add_message(Message::user("hello", session.id));
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(back.messages[0].content, "hello");
    }
}
