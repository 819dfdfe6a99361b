//! Groq client configuration.

/// Default model served by the Groq API.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Bearer token for `api.groq.com`.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature passed through to the API.
    pub temperature: f32,
    /// Upper bound on generated tokens per reply.
    pub max_tokens: u32,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
