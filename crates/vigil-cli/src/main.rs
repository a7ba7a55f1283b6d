mod config;
mod repl;

use clap::{Parser, Subcommand};
use config::{VigilConfig, HOSTS_ENV};
use repl::Repl;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_agent::{Agent, AgentRunner, LlmProvider};
use vigil_netdata::{register_netdata_tools, system_prompt, HostPolicy, NetdataClient, ToolContext};
use vigil_skills::SkillRegistry;

#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Vigil: ask an LLM about your Netdata nodes")]
pub struct Cli {
    /// Netdata host URL(s) the assistant may query
    #[arg(long, num_args = 1..)]
    pub host: Vec<String>,

    /// Model to use (default gpt-4o-mini)
    #[arg(long)]
    pub model: Option<String>,

    /// Model provider: openai, claude, ollama or openrouter
    #[arg(long)]
    pub provider: Option<LlmProvider>,

    /// Override the provider's API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Answer this question and exit
    #[arg(short, long)]
    pub question: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tool-call rounds allowed per question
    #[arg(long)]
    pub max_tool_rounds: Option<u32>,

    /// Where /save writes transcripts
    #[arg(long)]
    pub chats_dir: Option<PathBuf>,

    /// Print tool calls and results
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tools offered to the model
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => VigilConfig::load(path).await?,
        None => VigilConfig::default(),
    };
    config.apply_flags(&cli, std::env::var(HOSTS_ENV).ok().as_deref());
    config.model.resolve_api_key();

    let mut registry = SkillRegistry::new();
    let ctx = ToolContext::new(NetdataClient::new()?, HostPolicy::new(&config.hosts));
    register_netdata_tools(&mut registry, &ctx);
    info!(count = registry.skill_count(), hosts = ?config.hosts, "Netdata tools registered");

    if let Some(Commands::Tools) = cli.command {
        print_tools(&registry);
        return Ok(());
    }

    if let Some(var) = config.missing_api_key() {
        anyhow::bail!(
            "no API key for provider '{}': set {var} or model.api_key in the config file",
            config.model.provider
        );
    }

    let model_id = config.model.model_id.clone();
    let runner = AgentRunner::new(config.model, Arc::new(registry))?;
    let mut agent = Agent::new(runner, model_id, system_prompt(&config.hosts));

    let mut stdout = std::io::stdout();
    if let Some(question) = cli.question.as_deref() {
        return repl::one_shot(&mut agent, question, cli.verbose, &mut stdout).await;
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(agent, config.chats_dir, cli.verbose);
    repl.run(stdin, &mut stdout).await
}

fn print_tools(registry: &SkillRegistry) {
    println!("Tools offered to the model:");
    for skill in registry.list_descriptors() {
        println!("  {}: {}", skill.name, skill.description);
        for param in &skill.parameters {
            let need = if param.required { "required" } else { "optional" };
            println!("      {} ({need}): {}", param.name, param.description);
        }
    }
    println!("\nTotal: {} tool(s)", registry.skill_count());
}
