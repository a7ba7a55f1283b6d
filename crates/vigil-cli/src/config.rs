use crate::Cli;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vigil_agent::ModelConfig;

pub const DEFAULT_HOST: &str = "http://localhost:19999";
pub const DEFAULT_CHATS_DIR: &str = "example_chats";
/// Comma separated node URLs used when neither flags nor the file name any.
pub const HOSTS_ENV: &str = "NETDATA_URL_LIST";

/// Settings file, merged with command-line flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub hosts: Vec<String>,
    pub chats_dir: PathBuf,
    pub model: ModelConfig,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            chats_dir: PathBuf::from(DEFAULT_CHATS_DIR),
            model: ModelConfig::default(),
        }
    }
}

impl VigilConfig {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply flag overrides.
    ///
    /// Hosts come from `--host`, else the file, else `env_hosts`, else
    /// [`DEFAULT_HOST`].
    pub fn apply_flags(&mut self, cli: &Cli, env_hosts: Option<&str>) {
        let flag_hosts: Vec<String> = cli.host.iter().flat_map(|h| split_hosts(h)).collect();
        if !flag_hosts.is_empty() {
            self.hosts = flag_hosts;
        } else if self.hosts.is_empty() {
            self.hosts = env_hosts.map(split_hosts).unwrap_or_default();
        }
        if self.hosts.is_empty() {
            self.hosts.push(DEFAULT_HOST.to_string());
        }

        if let Some(model) = &cli.model {
            self.model.model_id = model.clone();
        }
        if let Some(provider) = cli.provider {
            self.model.provider = provider;
        }
        if let Some(url) = &cli.api_base_url {
            self.model.api_base_url = Some(url.clone());
        }
        if let Some(rounds) = cli.max_tool_rounds {
            self.model.max_tool_rounds = rounds;
        }
        if let Some(dir) = &cli.chats_dir {
            self.chats_dir = dir.clone();
        }
    }

    /// Provider key variable to complain about, if a hosted provider is
    /// selected without any key.
    pub fn missing_api_key(&self) -> Option<&'static str> {
        if !self.model.api_key.is_empty() || self.model.api_base_url.is_some() {
            return None;
        }
        self.model.provider.api_key_env()
    }
}

/// Split a comma or whitespace separated host list.
pub fn split_hosts(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}
