use crate::config::ModelConfig;
use crate::llm::{LlmClient, LlmResponse};
use std::sync::Arc;
use tracing::{info, warn};
use vigil_core::{Message, VigilResult};
use vigil_session::Session;
use vigil_skills::{SkillDescriptor, SkillRegistry};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model's final answer, possibly empty.
    Answer(String),
    /// The model was still requesting tools after the allowed rounds.
    TurnLimitExceeded { rounds: u32 },
}

/// The Agent Runner: orchestrates the tool-calling loop.
/// Prompt → LLM → ToolCall → Execute Skill → Backfill → Repeat.
pub struct AgentRunner {
    llm: LlmClient,
    skills: Arc<SkillRegistry>,
    max_tool_rounds: u32,
}

impl AgentRunner {
    pub fn new(config: ModelConfig, skills: Arc<SkillRegistry>) -> VigilResult<Self> {
        let max_tool_rounds = config.max_tool_rounds;
        Ok(Self::with_client(LlmClient::new(config)?, skills, max_tool_rounds))
    }

    pub fn with_client(llm: LlmClient, skills: Arc<SkillRegistry>, max_tool_rounds: u32) -> Self {
        Self {
            llm,
            skills,
            max_tool_rounds,
        }
    }

    pub fn client(&self) -> &LlmClient {
        &self.llm
    }

    pub fn skills(&self) -> &Arc<SkillRegistry> {
        &self.skills
    }

    pub fn max_tool_rounds(&self) -> u32 {
        self.max_tool_rounds
    }

    /// Run one turn: append `user_input`, then call the model and execute
    /// tools until it answers.
    ///
    /// The model sees at most `max_tool_rounds` rounds of tool results; if
    /// it asks for more after that, the request is discarded and the turn
    /// ends with [`TurnOutcome::TurnLimitExceeded`]. Backend errors are
    /// returned as-is. In every case the session only ever holds complete
    /// call/result groups.
    pub async fn run(&self, session: &mut Session, user_input: &str) -> VigilResult<TurnOutcome> {
        let session_id = session.id;
        session.add_message(Message::user(user_input, session_id));

        let system_prompt = Some(session.system_prompt.clone()).filter(|p| !p.is_empty());
        let tool_descriptors: Vec<SkillDescriptor> =
            self.skills.list_descriptors().into_iter().cloned().collect();

        info!(session_id = %session_id, tools = tool_descriptors.len(), "Starting agentic loop");

        let mut rounds = 0;
        loop {
            info!(session_id = %session_id, round = rounds, "Agentic loop round");

            let response = self
                .llm
                .chat(system_prompt.as_deref(), &session.messages, &tool_descriptors)
                .await?;

            let (content, tool_calls) = match response {
                LlmResponse::Final(text) => {
                    session.add_message(Message::assistant(text.as_str(), session_id));
                    info!(session_id = %session_id, rounds, "Agentic loop completed");
                    return Ok(TurnOutcome::Answer(text));
                }
                LlmResponse::ToolUse { content, tool_calls } if tool_calls.is_empty() => {
                    session.add_message(Message::assistant(content.as_str(), session_id));
                    return Ok(TurnOutcome::Answer(content));
                }
                LlmResponse::ToolUse { content, tool_calls } => (content, tool_calls),
            };

            if rounds >= self.max_tool_rounds {
                warn!(
                    session_id = %session_id,
                    max_tool_rounds = self.max_tool_rounds,
                    pending_calls = tool_calls.len(),
                    "Agentic loop reached max tool rounds"
                );
                return Ok(TurnOutcome::TurnLimitExceeded { rounds });
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                info!(
                    session_id = %session_id,
                    tool = %call.name,
                    call_id = %call.id,
                    "Executing tool call"
                );
                let result = self.skills.execute(call.clone()).await;
                if result.is_error {
                    warn!(tool = %call.name, call_id = %call.id, error = %result.content, "Tool call failed");
                }
                results.push(Message::tool_result(result, session_id));
            }

            let request = Message::assistant_tool_calls(content, tool_calls, session_id);
            session.extend(std::iter::once(request).chain(results));
            rounds += 1;
        }
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("skills", &self.skills.skill_count())
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish_non_exhaustive()
    }
}
