pub mod claude;
pub mod openai;

use crate::llm::LlmResponse;
use async_trait::async_trait;
use std::time::Duration;
use vigil_core::{Message, VigilError, VigilResult};
use vigil_skills::SkillDescriptor;

/// Deadline for one model request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Trait for LLM provider backends.
///
/// To add a provider: implement `LlmBackend` in `backends/`, add the
/// variant to `LlmProvider` and wire it up in `LlmClient::new()`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Submit the full conversation and the available tools.
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[SkillDescriptor],
    ) -> VigilResult<LlmResponse>;
}

pub(crate) fn http_client() -> VigilResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| VigilError::Backend(format!("failed to build HTTP client: {e}")))
}

/// POST `body` and return the parsed JSON reply, mapping every failure to
/// [`VigilError::Backend`].
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> VigilResult<serde_json::Value> {
    let resp = request
        .json(body)
        .send()
        .await
        .map_err(|e| VigilError::Backend(format!("{provider} request failed: {e}")))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| VigilError::Backend(format!("{provider} response unreadable: {e}")))?;

    if !status.is_success() {
        let snippet: String = text.trim().chars().take(500).collect();
        return Err(VigilError::Backend(format!(
            "{provider} API error {status}: {snippet}"
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| VigilError::Backend(format!("{provider} returned malformed JSON: {e}")))
}
