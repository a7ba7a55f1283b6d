/// Top-level error type for Vigil.
///
/// Each variant corresponds to a subsystem that can produce errors. Only
/// [`VigilError::Backend`] is meant to escape a conversation turn; the others
/// are folded into error-bearing tool results by the skill registry.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// An error originating from the agent execution loop.
    #[error("Agent error: {0}")]
    Agent(String),

    /// The language-model backend could not be reached or answered badly.
    #[error("Model backend error: {0}")]
    Backend(String),

    /// The monitored node's HTTP API failed, timed out or returned garbage.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// An error raised by a skill during invocation.
    #[error("Skill error: {0}")]
    Skill(String),

    /// Tool arguments did not match the declared parameters.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// An error related to session state or transcript persistence.
    #[error("Session error: {0}")]
    Session(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`VigilError`].
pub type VigilResult<T> = Result<T, VigilError>;
