use super::{http_client, post_json, LlmBackend};
use crate::config::{LlmProvider, ModelConfig};
use crate::llm::LlmResponse;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use vigil_core::{Message, Role, ToolCall, VigilError, VigilResult};
use vigil_skills::SkillDescriptor;

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Ollama and any other provider that
/// implements the chat completions API with function tools.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> VigilResult<Self> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }

    fn build_tools(&self, tools: &[SkillDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema(),
                    }
                })
            })
            .collect()
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = if self.config.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.config.api_key)
        };

        if self.config.provider == LlmProvider::OpenRouter {
            request.header("X-Title", "Vigil")
        } else {
            request
        }
    }
}

/// Convert a session history into chat completions messages.
pub fn build_messages(system_prompt: Option<&str>, messages: &[Message]) -> Vec<Value> {
    let mut api_messages = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system_prompt {
        api_messages.push(json!({"role": "system", "content": sys}));
    }

    for m in messages {
        let entry = match m.role {
            Role::Assistant if m.has_tool_calls() => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": c.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if m.content.is_empty() {
                    Value::Null
                } else {
                    Value::String(m.content.clone())
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id.clone().unwrap_or_default(),
                "content": m.content,
            }),
            role => json!({"role": role.as_str(), "content": m.content}),
        };
        api_messages.push(entry);
    }
    api_messages
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[SkillDescriptor],
    ) -> VigilResult<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let mut body = json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": build_messages(system_prompt, messages),
        });
        if !tools.is_empty() {
            body["tools"] = json!(self.build_tools(tools));
        }

        debug!(url = %url, messages = messages.len(), tools = tools.len(), "Chat completion request");
        let request = self.add_provider_headers(self.http.post(&url));
        let resp_body = post_json(self.config.provider.as_str(), request, &body).await?;

        parse_openai_response(&resp_body)
    }
}

pub fn parse_openai_response(body: &Value) -> VigilResult<LlmResponse> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| VigilError::Backend(format!("response has no choices: {body}")))?;

    let content = message["content"].as_str().unwrap_or_default().to_string();

    let tool_calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(i, tc)| ToolCall {
                    id: tc["id"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{i}")),
                    name: tc["function"]["name"].as_str().unwrap_or_default().to_string(),
                    arguments: parse_arguments(&tc["function"]["arguments"]),
                })
                .collect()
        })
        .unwrap_or_default();

    if tool_calls.is_empty() {
        Ok(LlmResponse::Final(content))
    } else {
        Ok(LlmResponse::ToolUse {
            content,
            tool_calls,
        })
    }
}

/// Arguments arrive as a JSON-encoded string. Undecodable text is kept as a
/// string so the registry reports it to the model instead of guessing.
fn parse_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(s) if s.trim().is_empty() => json!({}),
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        Value::Null => json!({}),
        other => other.clone(),
    }
}
