//! Structured-output generation for block structures
//!
//! This library covers the network half of the pipeline:
//! - **Prompt assembly**: a deterministic system instruction built from
//!   the palette and size limits
//! - **Backends**: the hosted Gemini API, plus an offline replay source
//!
//! # Example
//!
//! ```rust,ignore
//! use generation::{ClientSettings, GeminiBackend, GenerationBackend, GenerationConfig, Prompt};
//!
//! let config = GenerationConfig::default();
//! let backend = GeminiBackend::new(ClientSettings::new(api_key))?;
//!
//! let prompt = Prompt::new(&config, "a small stone watchtower");
//! let raw = backend.generate_prompt(&prompt).await?;
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod prompt;
pub mod types;

// Re-exports for convenience
pub use backend::{ClientSettings, GenerationBackend, GenerationError, ReplayBackend};

#[cfg(feature = "backend-gemini")]
pub use backend::GeminiBackend;

pub use config::{BoundsCheck, GenerationConfig};
pub use prompt::{build_system_prompt, Prompt};
