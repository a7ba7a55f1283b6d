use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    /// Anthropic Messages API.
    #[serde(alias = "anthropic")]
    Claude,
    /// Local Ollama server through its OpenAI-compatible endpoint.
    Ollama,
    OpenRouter,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Claude => "claude",
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenRouter => "openrouter",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAi => Some("OPENAI_API_KEY"),
            LlmProvider::Claude => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "claude" | "anthropic" => Ok(LlmProvider::Claude),
            "ollama" => Ok(LlmProvider::Ollama),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(format!(
                "unknown provider '{other}', expected openai, claude, ollama or openrouter"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Tool rounds allowed per user turn before giving up.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

fn default_model_id() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_tool_rounds() -> u32 {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model_id: default_model_id(),
            api_key: String::new(),
            api_base_url: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        if let Some(url) = self.api_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::Ollama => "http://localhost:11434",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
            }
        }
    }

    /// Fill an empty `api_key` from the provider's environment variable.
    pub fn resolve_api_key(&mut self) {
        if !self.api_key.is_empty() {
            return;
        }
        if let Some(var) = self.provider.api_key_env() {
            if let Ok(key) = std::env::var(var) {
                self.api_key = key;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("anthropic".parse::<LlmProvider>().unwrap(), LlmProvider::Claude);
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.model_id, "gpt-4o-mini");
        assert_eq!(config.max_tool_rounds, 10);
        assert_eq!(config.base_url(), "https://api.openai.com");
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let config = ModelConfig {
            provider: LlmProvider::Ollama,
            api_base_url: Some("http://gpu-box:11434/".into()),
            ..ModelConfig::default()
        };
        assert_eq!(config.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_toml_with_defaults() {
        let config: ModelConfig = toml::from_str(
            r#"
            provider = "anthropic"
            model_id = "claude-3-5-sonnet-20241022"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, LlmProvider::Claude);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.max_tool_rounds, 10);
        assert!(config.api_base_url.is_none());
        assert_eq!(config.base_url(), "https://api.anthropic.com");
    }

    #[test]
    fn test_explicit_key_not_overwritten() {
        let mut config = ModelConfig {
            api_key: "sk-explicit".into(),
            ..ModelConfig::default()
        };
        config.resolve_api_key();
        assert_eq!(config.api_key, "sk-explicit");
    }
}
