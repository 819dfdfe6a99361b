//! WebSocket streaming chat (`GET /api/chat/ws/{session_id}`).
//!
//! One connection serves one strictly serialized conversation loop: receive
//! a `{"message": …}` frame, stream the reply fragment-by-fragment as
//! `{"type":"stream","content":…}` events, emit `{"type":"done"}`, persist
//! the completed exchange, then wait for the next frame.  A frame arriving
//! mid-turn is queued and handled after the current turn finishes.
//!
//! A connection closed by the client — including mid-stream — ends the loop
//! silently; the interrupted turn is not persisted.

use std::collections::VecDeque;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::schemas::chat::{InboundMessage, StreamEvent};
use crate::state::AppState;

/// Register the streaming chat route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/{session_id}", get(chat_ws))
}

pub async fn chat_ws(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| chat_session_loop(state, session_id, socket))
}

/// What ended one streamed turn.
enum TurnOutcome {
    /// Every fragment was delivered; `done` was sent.
    Delivered(String),
    /// The client went away mid-turn; stop the loop, persist nothing.
    Disconnected,
}

async fn chat_session_loop(state: Arc<AppState>, session_id: String, socket: WebSocket) {
    info!(session_id = %session_id, "chat stream connected");
    let (mut sink, mut stream) = socket.split();
    // Frames that arrived while a turn was still streaming.
    let mut pending: VecDeque<String> = VecDeque::new();

    loop {
        let user_message = match pending.pop_front() {
            Some(message) => message,
            None => match next_message(&mut stream, &mut sink).await {
                Some(message) => message,
                None => break,
            },
        };

        // Serialize the whole turn against other writers for this session.
        let lock = state.chat.session_lock(&session_id);
        let _guard = lock.lock_owned().await;

        let fragments = match state.chat.stream_turn(&session_id, &user_message).await {
            Ok(fragments) => fragments,
            Err(e) => {
                let event = StreamEvent::Error {
                    message: e.to_string(),
                };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
                continue;
            }
        };

        match run_turn(fragments, &mut sink, &mut stream, &mut pending).await {
            TurnOutcome::Delivered(full_response) => {
                if send_event(&mut sink, &StreamEvent::Done).await.is_err() {
                    break;
                }
                match state
                    .chat
                    .record_turn(&session_id, &user_message, &full_response)
                    .await
                {
                    Ok(_) => {}
                    Err(e) => warn!(session_id = %session_id, error = %e, "failed to persist exchange"),
                }
            }
            TurnOutcome::Disconnected => break,
        }
    }

    info!(session_id = %session_id, "chat stream disconnected");
}

/// Wait for the next parseable user message; `None` when the client is gone.
async fn next_message(
    stream: &mut SplitStream<WebSocket>,
    sink: &mut SplitSink<WebSocket, Message>,
) -> Option<String> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match parse_inbound(&text) {
                Ok(message) => return Some(message),
                Err(reason) => {
                    let event = StreamEvent::Error { message: reason };
                    if send_event(sink, &event).await.is_err() {
                        return None;
                    }
                }
            },
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(error = %e, "websocket error while waiting for message");
                return None;
            }
        }
    }
}

/// Forward fragments until the sequence ends or the client disconnects.
///
/// The client side of the socket is watched concurrently so a close frame
/// interrupts the turn immediately instead of being noticed on the next
/// failed send; ordinary frames arriving early are queued for later.
async fn run_turn(
    mut fragments: crate::chat::TurnStream,
    sink: &mut SplitSink<WebSocket, Message>,
    stream: &mut SplitStream<WebSocket>,
    pending: &mut VecDeque<String>,
) -> TurnOutcome {
    let mut full_response = String::new();
    loop {
        tokio::select! {
            fragment = fragments.next() => match fragment {
                Some(chunk) => {
                    full_response.push_str(&chunk);
                    let event = StreamEvent::Stream { content: chunk };
                    if send_event(sink, &event).await.is_err() {
                        return TurnOutcome::Disconnected;
                    }
                }
                None => return TurnOutcome::Delivered(full_response),
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(message) = parse_inbound(&text) {
                        pending.push_back(message);
                    }
                }
                Some(Ok(Message::Close(_))) | None => return TurnOutcome::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "websocket error mid-turn");
                    return TurnOutcome::Disconnected;
                }
            },
        }
    }
}

fn parse_inbound(text: &str) -> Result<String, String> {
    serde_json::from_str::<InboundMessage>(text)
        .map(|frame| frame.message)
        .map_err(|_| r#"expected a JSON frame like {"message": "..."}"#.to_string())
}

/// Send a [`StreamEvent`] as a JSON text frame.
async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &StreamEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap();
    sink.send(Message::Text(json.into())).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────
