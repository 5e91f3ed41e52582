//! Pluggable generation backend abstraction
//!
//! The coordinator only talks to `GenerationBackend`, so the hosted
//! service, an offline replay source and test doubles are interchangeable.

#[cfg(feature = "backend-gemini")]
pub mod gemini;

pub mod replay;

use std::time::Duration;

use async_trait::async_trait;

use crate::constants::{defaults, timeouts};
use crate::prompt::Prompt;

#[cfg(feature = "backend-gemini")]
pub use gemini::GeminiBackend;

pub use replay::ReplayBackend;

/// Error types for generation requests.
///
/// Each variant is a distinct failure class; callers match on them to
/// decide what to log and what to show.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport-level failure (refused, timed out, DNS, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Service returned HTTP {status}")]
    Service { status: u16, body: String },

    /// The body did not contain the expected candidate text
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// HTTP status for service failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Connection settings for HTTP-based backends
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API credential sent with each request
    pub api_key: String,
    /// Model identifier (e.g., "gemini-2.0-flash")
    pub model: String,
    /// Service host, without trailing slash
    pub base_url: String,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Time allowed for the whole request; longer than `connect_timeout`
    pub request_timeout: Duration,
    /// Sampling temperature
    pub temperature: f32,
}

impl ClientSettings {
    /// Settings with defaults for everything but the credential
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request.max(connect);
        self
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: defaults::MODEL.to_string(),
            base_url: defaults::BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(timeouts::CONNECT_SECS),
            request_timeout: Duration::from_secs(timeouts::REQUEST_SECS),
            temperature: defaults::TEMPERATURE,
        }
    }
}

/// The trait every generation backend implements.
///
/// `generate` may take as long as the request timeout; callers run it on
/// a background task, never on the world-mutation thread.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Send one system/user pair and return the raw text output
    async fn generate(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> Result<String, GenerationError>;

    /// Convenience wrapper taking a built prompt
    async fn generate_prompt(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.generate(prompt.system_instruction(), prompt.user_text())
            .await
    }
}
