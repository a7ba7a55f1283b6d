use crate::backends::claude::ClaudeBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use std::sync::Arc;
use vigil_core::{Message, ToolCall, VigilResult};
use vigil_skills::SkillDescriptor;

/// Response from the model: a final answer or a batch of tool requests.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    Final(String),
    ToolUse {
        /// Text the model produced alongside the calls, possibly empty.
        content: String,
        tool_calls: Vec<ToolCall>,
    },
}

/// LLM client that dispatches to the correct provider backend.
///
/// Cloning is cheap and shares the backend.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn LlmBackend>,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> VigilResult<Self> {
        let backend: Arc<dyn LlmBackend> = match config.provider {
            LlmProvider::Claude => Arc::new(ClaudeBackend::new(config)?),
            LlmProvider::OpenAi | LlmProvider::Ollama | LlmProvider::OpenRouter => {
                Arc::new(OpenAiBackend::new(config)?)
            }
        };
        Ok(Self { backend })
    }

    /// Wrap a pre-built backend.
    pub fn from_backend(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[SkillDescriptor],
    ) -> VigilResult<LlmResponse> {
        self.backend.chat(system_prompt, messages, tools).await
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient").finish_non_exhaustive()
    }
}
