//! In-memory fakes for the chat service's two collaborators, shared by the
//! unit tests across modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use empire_ai::{AiClient, AiError, ChatTurn, FragmentStream};

use crate::chat::ChatService;
use crate::config::Config;
use crate::db::{ChatStore, Exchange, NewExchange};
use crate::routes;
use crate::state::AppState;

// ── Store fake ─────────────────────────────────────────────────────────────────

/// Append-only in-memory [`ChatStore`].
#[derive(Default)]
pub struct MemStore {
    exchanges: Mutex<Vec<Exchange>>,
    next_id: AtomicI64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            exchanges: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed a session with completed (user, assistant) pairs.
    pub async fn seed(&self, session_id: &str, pairs: &[(&str, &str)]) {
        for (user, assistant) in pairs {
            self.insert(NewExchange {
                session_id: session_id.to_string(),
                user_message: (*user).to_string(),
                bot_response: (*assistant).to_string(),
            })
            .await
            .expect("seed insert");
        }
    }

    /// Snapshot of everything persisted so far.
    pub async fn all(&self) -> Vec<Exchange> {
        self.exchanges.lock().unwrap().clone()
    }
}

impl ChatStore for MemStore {
    async fn find_recent(&self, session_id: &str, limit: u32) -> Result<Vec<Exchange>, sqlx::Error> {
        let exchanges = self.exchanges.lock().unwrap();
        let mut matching: Vec<Exchange> = exchanges
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        let start = matching.len().saturating_sub(limit as usize);
        Ok(matching.split_off(start))
    }

    async fn insert(&self, exchange: NewExchange) -> Result<Exchange, sqlx::Error> {
        let exchange = Exchange {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            session_id: exchange.session_id,
            user_message: exchange.user_message,
            bot_response: exchange.bot_response,
            is_useful: None,
            created_at: Utc::now(),
        };
        self.exchanges.lock().unwrap().push(exchange.clone());
        Ok(exchange)
    }

    async fn set_feedback(&self, id: i64, is_useful: bool) -> Result<bool, sqlx::Error> {
        let mut exchanges = self.exchanges.lock().unwrap();
        match exchanges.iter_mut().find(|e| e.id == id) {
            Some(exchange) => {
                exchange.is_useful = Some(is_useful);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── AI client fake ─────────────────────────────────────────────────────────────

/// One scripted answer for `complete_streaming`.
pub enum StreamScript {
    /// Yield these items, then end.
    Fragments(Vec<Result<String, AiError>>),
    /// Yield whatever the test feeds through the channel, ending when the
    /// sender is dropped.  Lets tests pace fragments against the consumer.
    Channel(tokio::sync::mpsc::Receiver<Result<String, AiError>>),
    /// Fail before producing any fragment.
    Fail(AiError),
}

/// Scripted [`AiClient`] that records every turn sequence it receives.
#[derive(Default)]
pub struct FakeAi {
    replies: Mutex<VecDeque<Result<String, AiError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
}

impl FakeAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<String, AiError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().unwrap().push_back(script);
    }

    /// Turn sequences captured from every call, in order.
    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiClient for FakeAi {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, AiError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::Api("no scripted reply".into())))
    }

    async fn complete_streaming(&self, turns: &[ChatTurn]) -> Result<FragmentStream, AiError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        match self.streams.lock().unwrap().pop_front() {
            Some(StreamScript::Fragments(items)) => Ok(Box::pin(futures::stream::iter(items))),
            Some(StreamScript::Channel(rx)) => {
                Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                })))
            }
            Some(StreamScript::Fail(err)) => Err(err),
            None => Err(AiError::Api("no scripted stream".into())),
        }
    }
}

// ── App harness ────────────────────────────────────────────────────────────────

/// Spin up the full router on an ephemeral port with a temp-file database
/// and the given scripted client.  Returns the bound address, the state for
/// post-hoc assertions, and the tempdir guard.
pub async fn spawn_app(
    ai: Arc<FakeAi>,
) -> (
    std::net::SocketAddr,
    Arc<AppState>,
    tempfile::TempDir,
) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/chat.db", dir.path().display());
    let store = crate::db::SqliteStore::connect(&url).await.expect("connect");

    let chat = ChatService::new(Arc::new(store), ai);
    let state = Arc::new(AppState {
        config: Arc::new(Config::from_env()),
        chat: Arc::new(chat),
    });

    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (addr, state, dir)
}
