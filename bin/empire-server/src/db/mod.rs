//! Database abstraction layer.
//!
//! [`ChatStore`] defines the interface the chat service persists through.
//! The default implementation is [`sqlite::SqliteStore`].  To swap to another
//! database (Postgres, MySQL, …), implement [`ChatStore`] for your new type
//! and change the concrete type in [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod sqlite;

use chrono::{DateTime, Utc};

pub use sqlite::SqliteStore;

/// A single row in the `chat_messages` table: one completed conversation
/// turn (user message plus assistant response).
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Row identifier, assigned by the store.
    pub id: i64,
    /// Opaque conversation key; a session is just the set of rows sharing it.
    pub session_id: String,
    /// What the visitor sent.
    pub user_message: String,
    /// What the assistant answered.
    pub bot_response: String,
    /// Visitor feedback: unset until the feedback endpoint flips it.
    pub is_useful: Option<bool>,
    /// Insert timestamp, assigned by the store.
    pub created_at: DateTime<Utc>,
}

/// Input for [`ChatStore::insert`]; id and timestamp are store-assigned.
#[derive(Debug, Clone)]
pub struct NewExchange {
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
}

/// Trait for persisting conversation exchanges.
///
/// Exchanges are append-only; the only mutation is the feedback flag.
pub trait ChatStore: Send + Sync + 'static {
    /// Load up to `limit` most recent exchanges for a session, ordered
    /// oldest first.
    fn find_recent(
        &self,
        session_id: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Exchange>, sqlx::Error>> + Send;

    /// Persist a completed exchange and return it with its assigned id and
    /// timestamp.
    fn insert(
        &self,
        exchange: NewExchange,
    ) -> impl std::future::Future<Output = Result<Exchange, sqlx::Error>> + Send;

    /// Record visitor feedback for an exchange.  Returns `false` when the
    /// exchange does not exist.
    fn set_feedback(
        &self,
        id: i64,
        is_useful: bool,
    ) -> impl std::future::Future<Output = Result<bool, sqlx::Error>> + Send;
}
