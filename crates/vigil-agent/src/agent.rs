use crate::runner::{AgentRunner, TurnOutcome};
use std::sync::Arc;
use tracing::info;
use vigil_core::{Message, Role, VigilError, VigilResult};
use vigil_session::Session;
use vigil_skills::SkillRegistry;

/// Longest title [`Agent::generate_title`] returns, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

const TITLE_PROMPT: &str = "You name conversations. Reply with a short, descriptive title \
for the conversation you are given: at most eight words, no quotes, no trailing punctuation.";

/// What a call to [`Agent::chat`] produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Every message appended during the turn, the user's included.
    pub new_messages: Vec<Message>,
}

impl TurnReport {
    /// The final answer, if the turn produced one.
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Answer(text) => Some(text),
            TurnOutcome::TurnLimitExceeded { .. } => None,
        }
    }

    /// Assistant tool requests and tool results, in order.
    pub fn tool_activity(&self) -> impl Iterator<Item = &Message> {
        self.new_messages
            .iter()
            .filter(|m| m.role == Role::Tool || m.has_tool_calls())
    }
}

/// A runner bound to one live session.
#[derive(Debug)]
pub struct Agent {
    runner: AgentRunner,
    session: Session,
}

impl Agent {
    pub fn new(runner: AgentRunner, model_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            runner,
            session: Session::new(model_id, system_prompt),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send `message` and run the turn to completion.
    ///
    /// Unless `continue_chat` is set the previous history is dropped first.
    /// On a backend error the session keeps what the turn appended so far.
    pub async fn chat(&mut self, message: &str, continue_chat: bool) -> VigilResult<TurnReport> {
        if !continue_chat {
            self.reset();
        }
        let start = self.session.message_count();
        let outcome = self.runner.run(&mut self.session, message).await?;
        Ok(TurnReport {
            outcome,
            new_messages: self.session.messages[start..].to_vec(),
        })
    }

    /// Start over with an empty history.
    pub fn reset(&mut self) {
        self.session = self.session.renewed();
        info!(session_id = %self.session.id, "Started new session");
    }

    /// Ask the model for a short title for the current conversation.
    ///
    /// Runs a separate, tool-less loop over a rendering of the history; the
    /// live session is not touched.
    pub async fn generate_title(&self) -> VigilResult<String> {
        let dialogue = render_dialogue(&self.session.messages);
        if dialogue.is_empty() {
            return Err(VigilError::Agent("nothing to title yet".into()));
        }

        let titler = AgentRunner::with_client(
            self.runner.client().clone(),
            Arc::new(SkillRegistry::new()),
            0,
        );
        let mut scratch = Session::new(self.session.model_id.clone(), TITLE_PROMPT);
        let request = format!("Give a title to this conversation:\n\n{dialogue}");

        match titler.run(&mut scratch, &request).await? {
            TurnOutcome::Answer(text) => Ok(clean_title(&text)),
            TurnOutcome::TurnLimitExceeded { .. } => Err(VigilError::Agent(
                "model asked for tools instead of producing a title".into(),
            )),
        }
    }
}

/// User and assistant text as `role: content` lines, tool traffic omitted.
fn render_dialogue(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant) && !m.content.trim().is_empty())
        .map(|m| format!("{}: {}", m.role.as_str(), m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_title(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default();
    let line = line.trim_start_matches('#').trim();
    let unquoted = line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*')).trim();
    unquoted.chars().take(MAX_TITLE_CHARS).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("\"RAM on parent node\"\n"), "RAM on parent node");
        assert_eq!(clean_title("## **Disk usage**"), "Disk usage");
        assert_eq!(clean_title("First line\nsecond line"), "First line");
        let long = "x".repeat(200);
        assert_eq!(clean_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_render_dialogue_skips_tool_traffic() {
        let sid = Uuid::new_v4();
        let messages = vec![
            Message::user("how much ram?", sid),
            Message::tool_result(vigil_core::ToolResult::success("c1", "{\"ram_total\":1}"), sid),
            Message::assistant("16 GB", sid),
        ];
        assert_eq!(render_dialogue(&messages), "user: how much ram?\nassistant: 16 GB");
    }
}
