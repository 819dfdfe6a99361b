//! The conversation session manager.
//!
//! Every turn runs the same three-step sequence: load the bounded history
//! window for the session, call the text-generation client with the
//! flattened turn list, persist the completed exchange.  Upstream failures
//! never escape as errors; they are translated into conversational fallback
//! text so the visitor always gets a reply.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use empire_ai::{AiClient, AiError, ChatTurn};
use futures::{Stream, StreamExt, stream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{ChatStore, Exchange, NewExchange};

use super::prompt::SYSTEM_PROMPT;

/// Number of most-recent exchanges loaded as context for each turn.
pub const HISTORY_WINDOW: u32 = 10;

/// Page size for the history endpoint.
const HISTORY_PAGE: u32 = 50;

/// Fragments with upstream errors already translated to fallback text.
pub type TurnStream = Pin<Box<dyn Stream<Item = String> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The message was empty (or whitespace); nothing was sent upstream.
    #[error("message must not be empty")]
    EmptyMessage,
    /// The exchange store failed.
    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Result of a one-shot turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
}

/// Session-scoped conversation manager.
///
/// Generic over the store so tests can substitute an in-memory fake; the
/// text-generation client is injected as a trait object for the same reason.
pub struct ChatService<S> {
    store: Arc<S>,
    ai: Arc<dyn AiClient>,
    /// Per-session turn locks; two turns for the same session id never
    /// interleave their load → generate → persist sequence.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: ChatStore> ChatService<S> {
    pub fn new(store: Arc<S>, ai: Arc<dyn AiClient>) -> Self {
        Self {
            store,
            ai,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one non-streaming turn.
    ///
    /// Generates a fresh session id when the caller has none yet.  The reply
    /// text is either the model output or a fallback message; either way one
    /// exchange is persisted.
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: Option<String>,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let lock = self.session_lock(&session_id);
        let _guard = lock.lock_owned().await;

        let history = self.store.find_recent(&session_id, HISTORY_WINDOW).await?;
        let turns = build_turns(&history, message);
        debug!(
            session_id = %session_id,
            history_len = history.len(),
            "dispatching chat turn"
        );

        let response = match self.ai.complete(&turns).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_reply(&AiError::Api("empty completion".into())),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "text generation failed");
                fallback_reply(&e)
            }
        };

        self.store
            .insert(NewExchange {
                session_id: session_id.clone(),
                user_message: message.to_string(),
                bot_response: response.clone(),
            })
            .await?;

        Ok(ChatReply {
            response,
            session_id,
        })
    }

    /// Start one streaming turn: load history, open the incremental
    /// completion, and return the fragment stream.
    ///
    /// Upstream errors — whether the call fails to open or the sequence
    /// breaks midway — surface as one final fallback-text fragment, so the
    /// caller only ever forwards plain text.  Persistence is the caller's
    /// step via [`ChatService::record_turn`] once the whole sequence has
    /// been delivered.
    pub async fn stream_turn(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<TurnStream, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let history = self.store.find_recent(session_id, HISTORY_WINDOW).await?;
        let turns = build_turns(&history, message);
        debug!(
            session_id = %session_id,
            history_len = history.len(),
            "dispatching streaming chat turn"
        );

        match self.ai.complete_streaming(&turns).await {
            Ok(fragments) => Ok(Box::pin(fragments.map(|item| match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "streaming generation failed mid-sequence");
                    fallback_reply(&e)
                }
            }))),
            Err(e) => {
                warn!(error = %e, "streaming generation failed to start");
                Ok(Box::pin(stream::iter(vec![fallback_reply(&e)])))
            }
        }
    }

    /// Persist a fully delivered streaming turn.
    ///
    /// A turn that produced no text at all (for example a sequence cut off
    /// before its first fragment) is dropped rather than persisted, so no
    /// exchange ever carries an empty response.
    pub async fn record_turn(
        &self,
        session_id: &str,
        user_message: &str,
        response: &str,
    ) -> Result<Option<Exchange>, ChatError> {
        if response.trim().is_empty() {
            debug!(session_id = %session_id, "skipping persistence of empty turn");
            return Ok(None);
        }
        let exchange = self
            .store
            .insert(NewExchange {
                session_id: session_id.to_string(),
                user_message: user_message.to_string(),
                bot_response: response.to_string(),
            })
            .await?;
        Ok(Some(exchange))
    }

    /// Recent exchanges for a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Exchange>, ChatError> {
        Ok(self.store.find_recent(session_id, HISTORY_PAGE).await?)
    }

    /// Record visitor feedback on an exchange.  Returns `false` when the
    /// exchange does not exist.
    pub async fn set_feedback(&self, exchange_id: i64, is_useful: bool) -> Result<bool, ChatError> {
        Ok(self.store.set_feedback(exchange_id, is_useful).await?)
    }

    /// The per-session turn lock.  Entries nobody holds any more are pruned
    /// on the way in, so the map does not grow with dead sessions.
    pub fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Flatten the history window into the turn sequence sent upstream: the
/// fixed system instruction, then user/assistant pairs in order, then the
/// new user message last.
fn build_turns(history: &[Exchange], message: &str) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() * 2 + 2);
    turns.push(ChatTurn::system(SYSTEM_PROMPT));
    for exchange in history {
        turns.push(ChatTurn::user(&exchange.user_message));
        turns.push(ChatTurn::assistant(&exchange.bot_response));
    }
    turns.push(ChatTurn::user(message));
    turns
}

/// Translate an upstream failure into the reply the visitor sees.
fn fallback_reply(err: &AiError) -> String {
    match err {
        AiError::RateLimited => {
            "⏱️ I'm currently handling too many requests. Please try again in a moment!".to_string()
        }
        AiError::Unauthenticated(_) => {
            "🔑 API configuration issue. Please contact the administrator.".to_string()
        }
        other => {
            let detail: String = other.to_string().chars().take(100).collect();
            format!("⚠️ I encountered a technical issue: {detail}. Please try rephrasing your question!")
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
