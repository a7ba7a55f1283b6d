use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;
use vigil_agent::{Agent, TurnOutcome, TurnReport};
use vigil_core::{Message, Role};
use vigil_session::{Speaker, Transcript};

/// Title used when the model cannot produce one.
pub const FALLBACK_TITLE: &str = "Netdata chat";

const RESULT_PREVIEW_CHARS: usize = 400;

/// A line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Reset,
    Save,
    Title,
    Empty,
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Command::Empty,
            "/exit" | "/quit" | "/bye" => Command::Exit,
            "/reset" => Command::Reset,
            "/save" => Command::Save,
            "/title" => Command::Title,
            _ => Command::Ask(line.to_string()),
        }
    }
}

/// Interactive session: reads lines, answers them and keeps a transcript.
pub struct Repl {
    agent: Agent,
    transcript: Transcript,
    chats_dir: PathBuf,
    verbose: bool,
}

impl Repl {
    pub fn new(agent: Agent, chats_dir: PathBuf, verbose: bool) -> Self {
        Self {
            agent,
            transcript: Transcript::new(),
            chats_dir,
            verbose,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn run<R, W>(&mut self, mut input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(out, "{}", self.banner())?;

        let mut line = String::new();
        loop {
            write!(out, "You: ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line).await? == 0 {
                writeln!(out, "\nGoodbye!")?;
                return Ok(());
            }

            match Command::parse(&line) {
                Command::Empty => continue,
                Command::Exit => {
                    writeln!(out, "Goodbye!")?;
                    return Ok(());
                }
                Command::Reset => {
                    self.agent.reset();
                    self.transcript.clear();
                    writeln!(out, "Chat history cleared.")?;
                }
                Command::Save => self.save(out).await?,
                Command::Title => match self.agent.generate_title().await {
                    Ok(title) => writeln!(out, "Title: {title}")?,
                    Err(e) => writeln!(out, "Could not generate a title: {e}")?,
                },
                Command::Ask(question) => self.ask(&question, out).await?,
            }
        }
    }

    async fn ask<W: Write>(&mut self, question: &str, out: &mut W) -> std::io::Result<()> {
        self.transcript.push(Speaker::User, question);

        let report = match self.agent.chat(question, true).await {
            Ok(report) => report,
            Err(e) => {
                return self.notice(out, format!("An error occurred while processing your request: {e}"));
            }
        };

        for line in tool_lines(&report) {
            if self.verbose {
                writeln!(out, "  {line}")?;
            }
            self.transcript.push(Speaker::Tool, line);
        }

        match report.outcome {
            TurnOutcome::Answer(text) => {
                writeln!(out, "Agent: {text}\n")?;
                self.transcript.push(Speaker::Agent, text);
                Ok(())
            }
            TurnOutcome::TurnLimitExceeded { rounds } => self.notice(
                out,
                format!("No answer after {rounds} rounds of tool calls. Try a narrower question."),
            ),
        }
    }

    async fn save<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        if self.transcript.is_empty() {
            writeln!(out, "Nothing to save yet.")?;
            return Ok(());
        }

        let title = match self.agent.generate_title().await {
            Ok(title) if !title.is_empty() => title,
            Ok(_) => FALLBACK_TITLE.to_string(),
            Err(e) => {
                warn!(error = %e, "Title generation failed");
                FALLBACK_TITLE.to_string()
            }
        };
        self.transcript.set_title(&title);

        match self.transcript.save(&self.chats_dir).await {
            Ok(path) => writeln!(out, "Chat history saved to: {}", path.display()),
            Err(e) => writeln!(out, "Could not save chat history: {e}"),
        }
    }

    fn notice<W: Write>(&mut self, out: &mut W, text: String) -> std::io::Result<()> {
        writeln!(out, "{text}\n")?;
        self.transcript.push(Speaker::Notice, text);
        Ok(())
    }

    fn banner(&self) -> String {
        format!(
            "Welcome to Vigil!\n\
             Ask about your Netdata nodes (charts, alarms, metrics) and press Enter.\n\
             Type '/exit', '/quit' or '/bye' to end the session.\n\
             Type '/save' to save the chat to {}.\n\
             Type '/title' to see a title for the chat so far.\n\
             Type '/reset' to clear the chat history.\n",
            self.chats_dir.display()
        )
    }
}

/// Answer a single question on a fresh session and print the answer.
pub async fn one_shot<W: Write>(
    agent: &mut Agent,
    question: &str,
    verbose: bool,
    out: &mut W,
) -> anyhow::Result<()> {
    let report = agent.chat(question, false).await?;
    if verbose {
        for line in tool_lines(&report) {
            writeln!(out, "  {line}")?;
        }
    }
    match report.outcome {
        TurnOutcome::Answer(text) => {
            writeln!(out, "{text}")?;
            Ok(())
        }
        TurnOutcome::TurnLimitExceeded { rounds } => {
            anyhow::bail!("no answer after {rounds} rounds of tool calls")
        }
    }
}

/// One line per tool request and result in the turn.
fn tool_lines(report: &TurnReport) -> Vec<String> {
    report.tool_activity().flat_map(describe).collect()
}

fn describe(message: &Message) -> Vec<String> {
    if message.role == Role::Tool {
        let tag = if message.is_error { "error" } else { "result" };
        let id = message.tool_call_id.as_deref().unwrap_or("?");
        return vec![format!("[{tag} {id}] {}", preview(&message.content))];
    }
    message
        .tool_calls
        .iter()
        .map(|call| format!("[call {}] {call}", call.id))
        .collect()
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(RESULT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use vigil_agent::{AgentRunner, LlmBackend, LlmClient, LlmResponse};
    use vigil_core::{ToolCall, VigilError, VigilResult};
    use vigil_session::read_transcript;
    use vigil_skills::{SkillDescriptor, SkillRegistry};

    struct Scripted(Mutex<VecDeque<VigilResult<LlmResponse>>>);

    #[async_trait]
    impl LlmBackend for Scripted {
        async fn chat(
            &self,
            _system_prompt: Option<&str>,
            _messages: &[Message],
            _tools: &[SkillDescriptor],
        ) -> VigilResult<LlmResponse> {
            self.0
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(VigilError::Backend("script exhausted".into())))
        }
    }

    fn agent(script: Vec<VigilResult<LlmResponse>>) -> Agent {
        let client = LlmClient::from_backend(Arc::new(Scripted(Mutex::new(script.into()))));
        let runner = AgentRunner::with_client(client, Arc::new(SkillRegistry::new()), 1);
        Agent::new(runner, "test-model", "You answer questions about Netdata nodes.")
    }

    async fn drive(repl: &mut Repl, input: &str) -> String {
        let mut out = Vec::new();
        repl.run(input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/EXIT\n"), Command::Exit);
        assert_eq!(Command::parse("  /bye "), Command::Exit);
        assert_eq!(Command::parse("/Quit"), Command::Exit);
        assert_eq!(Command::parse("/reset"), Command::Reset);
        assert_eq!(Command::parse("/save"), Command::Save);
        assert_eq!(Command::parse("/title"), Command::Title);
        assert_eq!(Command::parse("   \n"), Command::Empty);
        assert_eq!(
            Command::parse(" How much RAM? \n"),
            Command::Ask("How much RAM?".into())
        );
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(RESULT_PREVIEW_CHARS + 10);
        assert!(preview(&long).ends_with("..."));
        assert_eq!(preview(&long).chars().count(), RESULT_PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn test_answer_then_exit() {
        let mut repl = Repl::new(
            agent(vec![Ok(LlmResponse::Final("16 GB of RAM".into()))]),
            PathBuf::from("unused"),
            false,
        );
        let out = drive(&mut repl, "\nHow much RAM?\n/exit\nnever read\n").await;

        assert!(out.starts_with("Welcome to Vigil!"));
        assert!(out.contains("Agent: 16 GB of RAM"));
        assert!(out.trim_end().ends_with("Goodbye!"));
        assert_eq!(repl.transcript().len(), 2);
        assert_eq!(repl.agent.session().message_count(), 2);
    }

    #[tokio::test]
    async fn test_eof_exits() {
        let mut repl = Repl::new(agent(vec![]), PathBuf::from("unused"), false);
        let out = drive(&mut repl, "").await;
        assert!(out.contains("Goodbye!"));
        assert!(repl.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_keeps_reading() {
        let mut repl = Repl::new(
            agent(vec![
                Err(VigilError::Backend("OpenAI API error 500".into())),
                Ok(LlmResponse::Final("second try worked".into())),
            ]),
            PathBuf::from("unused"),
            false,
        );
        let out = drive(&mut repl, "first\nsecond\n/quit\n").await;

        assert!(out.contains("An error occurred while processing your request"));
        assert!(out.contains("Agent: second try worked"));
        let speakers: Vec<Speaker> = repl.transcript().entries.iter().map(|e| e.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::User, Speaker::Notice, Speaker::User, Speaker::Agent]
        );
    }

    #[tokio::test]
    async fn test_turn_limit_reported_and_verbose_tool_lines() {
        let call = |id: &str| LlmResponse::ToolUse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: id.into(),
                name: "get_info".into(),
                arguments: json!({"netdata_host_url": "http://localhost:19999"}),
            }],
        };
        let mut repl = Repl::new(
            agent(vec![Ok(call("c1")), Ok(call("c2"))]),
            PathBuf::from("unused"),
            true,
        );
        let out = drive(&mut repl, "loop forever\n").await;

        assert!(out.contains("[call c1] get_info"));
        assert!(out.contains("[error c1] Unknown tool: get_info"));
        assert!(out.contains("No answer after 1 rounds of tool calls"));
    }

    #[tokio::test]
    async fn test_reset_clears_history_and_transcript() {
        let mut repl = Repl::new(
            agent(vec![Ok(LlmResponse::Final("hello".into()))]),
            PathBuf::from("unused"),
            false,
        );
        let out = drive(&mut repl, "hi\n/reset\n").await;

        assert!(out.contains("Chat history cleared."));
        assert!(repl.transcript().is_empty());
        assert_eq!(repl.agent.session().message_count(), 0);
    }

    #[tokio::test]
    async fn test_save_writes_titled_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut repl = Repl::new(
            agent(vec![
                Ok(LlmResponse::Final("Parent has 16 GB".into())),
                Ok(LlmResponse::Final("\"RAM on the parent node\"".into())),
            ]),
            dir.path().to_path_buf(),
            false,
        );
        let out = drive(&mut repl, "How much RAM?\n/save\n/exit\n").await;
        assert!(out.contains("Chat history saved to: "));

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let saved = read_transcript(&files[0].as_ref().unwrap().path()).await.unwrap();
        assert_eq!(saved.title, "RAM on the parent node");
        assert_eq!(saved.entries, repl.transcript().entries);
    }

    #[tokio::test]
    async fn test_save_falls_back_to_default_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut repl = Repl::new(
            agent(vec![Ok(LlmResponse::Final("answer".into()))]),
            dir.path().to_path_buf(),
            false,
        );
        drive(&mut repl, "question\n/save\n").await;
        assert_eq!(repl.transcript().title, FALLBACK_TITLE);
    }

    #[tokio::test]
    async fn test_save_with_nothing_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut repl = Repl::new(agent(vec![]), dir.path().to_path_buf(), false);
        let out = drive(&mut repl, "/save\n").await;
        assert!(out.contains("Nothing to save yet."));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_one_shot() {
        let mut agent = agent(vec![Ok(LlmResponse::Final("3 alarms are raised".into()))]);
        let mut out = Vec::new();
        one_shot(&mut agent, "any alarms?", false, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3 alarms are raised\n");
    }

    #[tokio::test]
    async fn test_one_shot_backend_error_fails() {
        let mut agent = agent(vec![Err(VigilError::Backend("down".into()))]);
        let mut out = Vec::new();
        assert!(one_shot(&mut agent, "any alarms?", false, &mut out).await.is_err());
    }
}
