//! SQLite implementation of [`ChatStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature.  Migrations are run automatically
//! on startup via [`SqliteStore::connect`].
//!
//! # Migrations path
//!
//! `sqlx::migrate!("./migrations")` resolves the path **at compile time**
//! relative to `CARGO_MANIFEST_DIR` (the crate root), so the directory is
//! embedded into the binary.  The database file location is determined at
//! runtime by the `EMPIRE_DATABASE_URL` environment variable and is **not**
//! related to the current working directory at runtime.
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used deliberately so that no
//! `DATABASE_URL` environment variable is needed at compile time.

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use super::{ChatStore, Exchange, NewExchange};

/// SQLite-backed exchange store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending
    /// migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://empire.db"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

type ExchangeRow = (i64, String, String, String, Option<bool>, String);

/// Timestamps are stored as fixed-width RFC 3339 text so that SQL string
/// ordering matches chronological ordering.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_row(row: ExchangeRow) -> Exchange {
    let (id, session_id, user_message, bot_response, is_useful, created_at) = row;
    Exchange {
        id,
        session_id,
        user_message,
        bot_response,
        is_useful,
        created_at: created_at.parse().unwrap_or_else(|e: chrono::ParseError| {
            tracing::warn!(raw = %created_at, error = %e, "failed to parse exchange created_at; using now");
            Utc::now()
        }),
    }
}

impl ChatStore for SqliteStore {
    async fn find_recent(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<Exchange>, sqlx::Error> {
        // Newest-first window, then reversed so callers see oldest first.
        // The id tiebreak keeps the order stable for equal timestamps.
        let mut rows: Vec<ExchangeRow> = sqlx::query_as(
            "SELECT id, session_id, user_message, bot_response, is_useful, created_at \
             FROM chat_messages WHERE session_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn insert(&self, exchange: NewExchange) -> Result<Exchange, sqlx::Error> {
        let created_at = now_rfc3339();
        let result = sqlx::query(
            "INSERT INTO chat_messages (session_id, user_message, bot_response, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&exchange.session_id)
        .bind(&exchange.user_message)
        .bind(&exchange.bot_response)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(Exchange {
            id: result.last_insert_rowid(),
            session_id: exchange.session_id,
            user_message: exchange.user_message,
            bot_response: exchange.bot_response,
            is_useful: None,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    async fn set_feedback(&self, id: i64, is_useful: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE chat_messages SET is_useful = ?1 WHERE id = ?2")
            .bind(is_useful)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::SqliteStore;
    use crate::db::{ChatStore, NewExchange};

    async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}/chat.db", dir.path().display());
        let store = SqliteStore::connect(&url).await.expect("connect");
        (store, dir)
    }

    fn new_exchange(session_id: &str, n: usize) -> NewExchange {
        NewExchange {
            session_id: session_id.to_string(),
            user_message: format!("question {n}"),
            bot_response: format!("answer {n}"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let (store, _dir) = temp_store().await;
        let first = store.insert(new_exchange("s", 1)).await.expect("insert");
        let second = store.insert(new_exchange("s", 2)).await.expect("insert");
        assert!(second.id > first.id);
        assert!(second.created_at >= first.created_at);
        assert_eq!(first.is_useful, None);
    }

    #[tokio::test]
    async fn find_recent_returns_window_oldest_first() {
        let (store, _dir) = temp_store().await;
        for n in 0..5 {
            store.insert(new_exchange("s", n)).await.expect("insert");
        }
        // Another session must not leak into the window.
        store.insert(new_exchange("other", 99)).await.expect("insert");

        let window = store.find_recent("s", 3).await.expect("find");
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].user_message, "question 2");
        assert_eq!(window[1].user_message, "question 3");
        assert_eq!(window[2].user_message, "question 4");
        for pair in window.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].id) < (pair[1].created_at, pair[1].id),
                "history must be strictly ordered"
            );
        }
    }

    #[tokio::test]
    async fn find_recent_unknown_session_is_empty() {
        let (store, _dir) = temp_store().await;
        let window = store.find_recent("nobody", 10).await.expect("find");
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn set_feedback_flips_only_the_flag() {
        let (store, _dir) = temp_store().await;
        let exchange = store.insert(new_exchange("s", 1)).await.expect("insert");

        assert!(store.set_feedback(exchange.id, true).await.expect("update"));
        let reloaded = store.find_recent("s", 10).await.expect("find");
        assert_eq!(reloaded[0].is_useful, Some(true));
        assert_eq!(reloaded[0].bot_response, exchange.bot_response);

        assert!(!store.set_feedback(9999, false).await.expect("update"));
    }
}
