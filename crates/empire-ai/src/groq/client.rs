//! Groq API client struct, request building, and response parsing.

use reqwest::StatusCode;

use crate::{AiError, ChatTurn};

use super::config::GroqConfig;

pub(crate) const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq chat-completions client.
pub struct GroqClient {
    pub(crate) config: GroqConfig,
    pub(crate) http: reqwest::Client,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Build the JSON request body for the chat-completions endpoint.
    pub(crate) fn build_request_body(
        &self,
        turns: &[ChatTurn],
        stream: bool,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": turn.role,
                    "content": turn.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }

    /// Parse a non-streaming completion response.
    pub(crate) fn parse_response(&self, json: serde_json::Value) -> Result<String, AiError> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AiError::Parse("missing message content in completion".into()))
    }
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn classify_status(status: StatusCode, detail: String) -> AiError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AiError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AiError::Unauthenticated(detail),
        _ => AiError::Api(format!("HTTP {status}: {detail}")),
    }
}

/// Resolve a response into `Ok` for success, or a classified error with a
/// truncated body excerpt otherwise.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let text: String = text.chars().take(200).collect();
    Err(classify_status(status, text))
}
