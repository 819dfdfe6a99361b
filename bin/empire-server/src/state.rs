//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::Config;
use crate::db::SqliteStore;

/// State shared across all HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Conversation session manager over the SQLite store.
    pub chat: Arc<ChatService<SqliteStore>>,
}
