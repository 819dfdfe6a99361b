//! Text-generation client for the Digital Empire backend.
//!
//! Provides the [`AiClient`] abstraction the chat service is built against,
//! plus the default [`GroqClient`] implementation with:
//! - One-shot chat completions
//! - Streaming (SSE) completions exposed as a fragment stream
//! - An error taxonomy that separates rate limiting and authentication
//!   failures from everything else

pub mod groq;
mod streaming;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use groq::{GroqClient, GroqConfig};

/// A finite stream of response fragments.
///
/// The stream ends when the underlying generation completes; it may end
/// early with an `Err` item if the upstream call fails mid-sequence.
/// Dropping the stream cancels the upstream read.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, AiError>> + Send>>;

#[async_trait]
pub trait AiClient: Send + Sync {
    /// Send the full turn sequence and return the assistant's reply.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, AiError>;

    /// Same request in incremental mode, yielding text fragments as the
    /// upstream model produces them.
    async fn complete_streaming(&self, turns: &[ChatTurn]) -> Result<FragmentStream, AiError>;
}

/// One turn in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The API rejected the request with HTTP 429.
    #[error("rate limited")]
    RateLimited,
    /// The API rejected the credentials (HTTP 401/403).
    #[error("authentication rejected: {0}")]
    Unauthenticated(String),
    /// Any other non-success response from the API.
    #[error("API error: {0}")]
    Api(String),
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}
