//! Chat API request / response types.
//!
//! The REST shapes mirror what the portfolio frontend already speaks:
//! `POST /api/chat/message` exchanges one message for one reply, and the
//! WebSocket stream emits tagged JSON events per fragment.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::Exchange;

/// Request body for `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The visitor's message.
    pub message: String,
    /// Session to continue; omit to start a new conversation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
}

/// Response body for `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// The assistant's reply.
    pub response: String,
    /// Session id the exchange was recorded under (generated when the
    /// request carried none).
    pub session_id: String,
}

/// Request body for `POST /api/chat/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    /// Exchange being rated.
    pub exchange_id: i64,
    /// Whether the reply was useful.
    pub is_useful: bool,
}

/// One persisted exchange as returned by the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeResponse {
    pub id: i64,
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub is_useful: Option<bool>,
    pub created_at: String,
}

impl Exchange {
    pub fn to_response(&self) -> ExchangeResponse {
        ExchangeResponse {
            id: self.id,
            session_id: self.session_id.clone(),
            user_message: self.user_message.clone(),
            bot_response: self.bot_response.clone(),
            is_useful: self.is_useful,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

/// Events the WebSocket endpoint sends to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// One response fragment, in arrival order.
    Stream { content: String },
    /// The turn's response sequence is complete.
    Done,
    /// The frame could not be processed; the conversation continues.
    Error { message: String },
}

/// Frame the WebSocket endpoint expects from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message: String,
}
