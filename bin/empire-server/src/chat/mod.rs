//! Conversation handling: per-session history, prompt assembly, and the
//! bridge to the text-generation client.

pub mod prompt;
pub mod service;

pub use service::{ChatError, ChatReply, ChatService, TurnStream};
