//! Gemini backend implementation
//!
//! Talks to the hosted `generateContent` endpoint with JSON output mode.

use async_trait::async_trait;

use super::{ClientSettings, GenerationBackend, GenerationError};
use crate::constants::defaults;
use crate::types::{extract_candidate_text, GenerateContentRequest};

/// Gemini backend using the public REST API
pub struct GeminiBackend {
    /// HTTP client with connect and request timeouts applied
    http_client: reqwest::Client,
    settings: ClientSettings,
}

impl GeminiBackend {
    /// Create a backend; fails only if the HTTP client cannot be built
    pub fn new(settings: ClientSettings) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    /// Model this backend sends requests to
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Endpoint URL without the credential
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::new(
            system_instruction,
            user_text,
            self.settings.temperature,
            defaults::RESPONSE_MIME_TYPE,
        );

        log::debug!(
            "Sending generateContent request to model {} ({} chars of description)",
            self.settings.model,
            user_text.len()
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Gemini API error {}: {}", status.as_u16(), body);
            return Err(GenerationError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Network(e.without_url()))?;

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            GenerationError::MalformedResponse(format!("response is not JSON: {}", e))
        })?;

        extract_candidate_text(&json)
            .map(str::to_string)
            .ok_or_else(|| {
                GenerationError::MalformedResponse(
                    "missing candidates[0].content.parts[0].text".to_string(),
                )
            })
    }
}
