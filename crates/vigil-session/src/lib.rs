//! Conversation state and transcript persistence for Vigil.

/// The ordered message history of one conversation.
pub mod session;
/// Markdown transcripts written by the interactive shell.
pub mod transcript;

pub use session::Session;
pub use transcript::{read_transcript, Speaker, Transcript, TranscriptEntry};
