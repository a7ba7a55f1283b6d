//! Core types and error definitions for Vigil.
//!
//! This crate provides the foundational types shared across all Vigil crates,
//! including error handling, message representations, and tool call abstractions.
//!
//! # Main types
//!
//! - [`VigilError`]: Unified error enum for all Vigil subsystems.
//! - [`VigilResult`]: Convenience alias for `Result<T, VigilError>`.
//! - [`Role`]: Message role (user, assistant, system, tool).
//! - [`Message`]: A single message within a conversation session.
//! - [`ToolCall`]: Represents an LLM-initiated tool invocation request.
//! - [`ToolResult`]: The result returned after executing a tool call.

/// Error enum and result alias.
pub mod error;
/// Conversation messages.
pub mod message;
/// Tool call request/result pair.
pub mod tool;

pub use error::{VigilError, VigilResult};
pub use message::{Message, Role};
pub use tool::{ToolCall, ToolResult};
