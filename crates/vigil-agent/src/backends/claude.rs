use super::{http_client, post_json, LlmBackend};
use crate::config::ModelConfig;
use crate::llm::LlmResponse;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use vigil_core::{Message, Role, ToolCall, VigilError, VigilResult};
use vigil_skills::SkillDescriptor;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude (Anthropic) Messages API backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> VigilResult<Self> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[SkillDescriptor],
    ) -> VigilResult<LlmResponse> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let claude_tools: Vec<ClaudeTool> = tools
            .iter()
            .map(|t| ClaudeTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters_schema(),
            })
            .collect();

        let mut body = json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": build_messages(messages),
        });
        if let Some(sys) = system_prompt {
            body["system"] = json!(sys);
        }
        if !claude_tools.is_empty() {
            body["tools"] = serde_json::to_value(&claude_tools)?;
        }

        debug!(url = %url, messages = messages.len(), tools = tools.len(), "Messages API request");
        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let resp_body = post_json("claude", request, &body).await?;

        parse_claude_response(&resp_body)
    }
}

// -- Claude wire types --

#[derive(Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: Value,
}

/// Stands in for an empty assistant answer, which the API refuses in history.
const EMPTY_ANSWER: &str = "(no answer)";

/// Convert a session history into Messages API turns.
///
/// Assistant tool requests become `tool_use` blocks; a run of consecutive
/// tool messages becomes one user turn of `tool_result` blocks. System
/// messages are dropped since the prompt travels in the `system` field.
pub fn build_messages(messages: &[Message]) -> Vec<Value> {
    let mut api_messages: Vec<Value> = Vec::new();
    let mut pending_results: Vec<Value> = Vec::new();

    for m in messages {
        if m.role == Role::Tool {
            pending_results.push(json!({
                "type": "tool_result",
                "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                "content": m.content,
                "is_error": m.is_error,
            }));
            continue;
        }
        if !pending_results.is_empty() {
            api_messages.push(json!({
                "role": "user",
                "content": std::mem::take(&mut pending_results),
            }));
        }

        match m.role {
            Role::User => api_messages.push(json!({"role": "user", "content": m.content})),
            Role::Assistant if m.has_tool_calls() => {
                let mut blocks = Vec::new();
                if !m.content.trim().is_empty() {
                    blocks.push(json!({"type": "text", "text": m.content}));
                }
                blocks.extend(m.tool_calls.iter().map(tool_use_block));
                api_messages.push(json!({"role": "assistant", "content": blocks}));
            }
            Role::Assistant => {
                let text = if m.content.trim().is_empty() {
                    EMPTY_ANSWER
                } else {
                    m.content.as_str()
                };
                api_messages.push(json!({"role": "assistant", "content": text}));
            }
            Role::System | Role::Tool => {}
        }
    }

    if !pending_results.is_empty() {
        api_messages.push(json!({"role": "user", "content": pending_results}));
    }
    api_messages
}

fn tool_use_block(call: &ToolCall) -> Value {
    let input = if call.arguments.is_object() {
        call.arguments.clone()
    } else {
        json!({})
    };
    json!({
        "type": "tool_use",
        "id": call.id,
        "name": call.name,
        "input": input,
    })
}

pub fn parse_claude_response(body: &Value) -> VigilResult<LlmResponse> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| VigilError::Backend(format!("missing content in Claude response: {body}")))?;

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t.to_string());
                }
            }
            Some("tool_use") => {
                tool_calls.push(ToolCall {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    let text = text_parts.join("\n");
    if tool_calls.is_empty() {
        Ok(LlmResponse::Final(text))
    } else {
        Ok(LlmResponse::ToolUse {
            content: text,
            tool_calls,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vigil_core::ToolResult;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "get_chart_info".into(),
            arguments: json!({"chart": "system.cpu"}),
        }
    }

    #[test]
    fn test_consecutive_results_merged() {
        let sid = Uuid::new_v4();
        let history = vec![
            Message::system("ignored", sid),
            Message::user("cpu?", sid),
            Message::assistant_tool_calls("Let me look.", vec![call("tu_1"), call("tu_2")], sid),
            Message::tool_result(ToolResult::success("tu_1", "ok"), sid),
            Message::tool_result(ToolResult::error("tu_2", "Error: 404"), sid),
            Message::assistant("Done.", sid),
        ];

        let api = build_messages(&history);
        assert_eq!(api.len(), 4);
        assert_eq!(api[0], json!({"role": "user", "content": "cpu?"}));
        assert_eq!(api[1]["content"][0]["text"], "Let me look.");
        assert_eq!(api[1]["content"][2]["id"], "tu_2");
        assert_eq!(api[2]["role"], "user");
        assert_eq!(api[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(api[2]["content"][1]["is_error"], true);
        assert_eq!(api[3]["content"], "Done.");
    }

    #[test]
    fn test_empty_answer_replaced_in_history() {
        let sid = Uuid::new_v4();
        let history = vec![
            Message::user("q", sid),
            Message::assistant("", sid),
            Message::user("again", sid),
            Message::assistant_tool_calls("  ", vec![call("tu_1")], sid),
        ];

        let api = build_messages(&history);
        assert_eq!(api.len(), 4);
        assert_eq!(api[1], json!({"role": "assistant", "content": EMPTY_ANSWER}));
        assert_eq!(api[2]["content"], "again");
        assert_eq!(api[3]["content"].as_array().unwrap().len(), 1);
        assert_eq!(api[3]["content"][0]["type"], "tool_use");
    }

    #[test]
    fn test_trailing_results_flushed() {
        let sid = Uuid::new_v4();
        let history = vec![
            Message::user("q", sid),
            Message::assistant_tool_calls("", vec![call("tu_1")], sid),
            Message::tool_result(ToolResult::success("tu_1", "ok"), sid),
        ];
        let api = build_messages(&history);
        assert_eq!(api.len(), 3);
        assert_eq!(api[1]["content"].as_array().unwrap().len(), 1);
        assert_eq!(api[2]["content"][0]["tool_use_id"], "tu_1");
    }

    #[test]
    fn test_parse_tool_use() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "tu_1", "name": "get_info", "input": {"netdata_host_url": "http://n:19999"}}
            ],
            "stop_reason": "tool_use"
        });
        let LlmResponse::ToolUse { content, tool_calls } = parse_claude_response(&body).unwrap() else {
            panic!("expected tool use");
        };
        assert_eq!(content, "Checking.");
        assert_eq!(tool_calls[0].name, "get_info");
    }

    #[test]
    fn test_parse_final_and_missing_content() {
        let body = json!({"content": [{"type": "text", "text": "All clear."}], "stop_reason": "end_turn"});
        assert_eq!(
            parse_claude_response(&body).unwrap(),
            LlmResponse::Final("All clear.".into())
        );
        assert!(parse_claude_response(&json!({"type": "error"})).is_err());
    }
}
