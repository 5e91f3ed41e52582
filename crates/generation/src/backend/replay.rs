//! Offline replay backend
//!
//! Serves a previously saved structure document instead of calling the
//! service. Used to re-run the pipeline on a captured response.

use std::path::Path;

use async_trait::async_trait;

use super::{GenerationBackend, GenerationError};

/// Backend that answers every request with the same text
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    text: String,
}

impl ReplayBackend {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load the document once, up front
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("Loaded replay document from {}", path.as_ref().display());
        Ok(Self::new(text))
    }
}

#[async_trait]
impl GenerationBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "Replay"
    }

    async fn generate(
        &self,
        _system_instruction: &str,
        user_text: &str,
    ) -> Result<String, GenerationError> {
        log::debug!("Replaying saved document for '{}'", user_text);
        Ok(self.text.clone())
    }
}
