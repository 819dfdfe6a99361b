//! AiClient trait implementation for GroqClient (complete + streaming).

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::streaming::{DONE_MARKER, SseParser, delta_content};
use crate::{AiClient, AiError, ChatTurn, FragmentStream};

use super::client::{GROQ_API_URL, GroqClient, error_for_status};

#[async_trait]
impl AiClient for GroqClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, AiError> {
        let body = self.build_request_body(turns, false);

        debug!(model = %self.config.model, turns = turns.len(), "chat completion request");

        let response = self
            .http
            .post(GROQ_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;
        let response = error_for_status(response).await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        self.parse_response(json)
    }

    async fn complete_streaming(&self, turns: &[ChatTurn]) -> Result<FragmentStream, AiError> {
        let body = self.build_request_body(turns, true);

        debug!(model = %self.config.model, turns = turns.len(), "streaming chat completion request");

        let response = self
            .http
            .post(GROQ_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;
        let response = error_for_status(response).await?;

        // A bounded channel decouples SSE parsing from the consumer: when
        // the receiving stream is dropped the next send fails and the reader
        // task stops, which aborts the upstream request.
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, AiError>>(32);
        tokio::spawn(async move {
            let byte_stream = response
                .bytes_stream()
                .map(|result| result.map_err(std::io::Error::other));
            let reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
            let mut lines = reader.lines();
            let mut parser = SseParser::new();

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(AiError::Network(e.to_string()))).await;
                        return;
                    }
                };
                let Some(payload) = parser.push_line(&line) else {
                    continue;
                };
                if payload == DONE_MARKER {
                    return;
                }
                if let Some(content) = delta_content(&payload) {
                    if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                        return;
                    }
                }
            }

            // Flush a final event that was not terminated by a blank line.
            if let Some(payload) = parser.finish() {
                if payload != DONE_MARKER {
                    if let Some(content) = delta_content(&payload) {
                        if !content.is_empty() {
                            let _ = tx.send(Ok(content)).await;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}
