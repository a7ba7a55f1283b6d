//! The Vigil agent: model backends and the tool-calling conversation loop.
//!
//! [`AgentRunner`] drives one turn: it submits the session to an
//! [`LlmBackend`], executes every requested tool through the shared
//! [`vigil_skills::SkillRegistry`], appends the results and resubmits until
//! the model answers or the round cap is hit. [`Agent`] wraps a runner and
//! a session for callers that just want to chat.

/// Conversation facade and title generation.
pub mod agent;
/// Provider implementations.
pub mod backends;
/// Provider and model settings.
pub mod config;
/// Provider dispatch.
pub mod llm;
/// The tool-calling loop.
pub mod runner;

pub use agent::{Agent, TurnReport};
pub use backends::LlmBackend;
pub use config::{LlmProvider, ModelConfig};
pub use llm::{LlmClient, LlmResponse};
pub use runner::{AgentRunner, TurnOutcome};
