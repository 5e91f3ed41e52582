//! Error types for the build engine

use std::path::PathBuf;
use std::time::Duration;

use generation::GenerationError;
use thiserror::Error;

use crate::coordinator::BuildStage;

/// Result type alias using BuildError
pub type Result<T> = std::result::Result<T, BuildError>;

/// The raw text could not be turned into a grid
#[derive(Debug, Error)]
pub enum GridError {
    /// Not JSON at all
    #[error("Structure is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON, but not an object with a `blocks` array
    #[error("Structure is missing {0}")]
    MissingField(&'static str),
}

/// Writing or reading a schematic failed
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The grid cannot be expressed in the schematic format
    #[error("Schematic encoding error: {0}")]
    Encode(String),

    /// The file is not a schematic this crate can read
    #[error("Schematic decoding error: {0}")]
    Decode(String),
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that end a build request.
///
/// `Display` carries diagnostics for the log; `user_message` is the
/// category shown to the requesting actor.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The actor asked again inside the cooldown window
    #[error("Cooldown active: {remaining_secs}s remaining")]
    Cooldown { remaining_secs: u64 },

    /// No generation credential is configured
    #[error("Generation credential not configured")]
    CredentialMissing,

    /// Nothing to generate
    #[error("Empty building description")]
    EmptyDescription,

    /// Generation service failure
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The generated text was not a usable structure
    #[error("Parse failed: {0}")]
    Parse(#[from] GridError),

    /// Writing the schematic failed
    #[error("Persist failed: {0}")]
    Persist(#[from] PersistError),

    /// The foreground executor is no longer running
    #[error("Foreground executor closed")]
    ForegroundClosed,

    /// A background task panicked or was aborted
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl BuildError {
    /// Build a cooldown error, rounding the remaining time up
    pub fn cooldown(remaining: Duration) -> Self {
        let mut remaining_secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            remaining_secs += 1;
        }
        Self::Cooldown { remaining_secs }
    }

    /// The stage that was being attempted when the request failed
    pub fn stage(&self) -> BuildStage {
        match self {
            Self::CredentialMissing | Self::EmptyDescription => BuildStage::Received,
            Self::Cooldown { .. } => BuildStage::RateChecked,
            Self::Generation(_) | Self::TaskFailed(_) => BuildStage::Dispatched,
            Self::Parse(_) => BuildStage::Validated,
            Self::Persist(_) | Self::ForegroundClosed => BuildStage::Materializing,
        }
    }

    /// Text safe to show to the actor; no internal diagnostics
    pub fn user_message(&self) -> String {
        match self {
            Self::Cooldown { remaining_secs } => format!("Cooldown: wait {}s", remaining_secs),
            Self::CredentialMissing => "Generation API key not configured.".to_string(),
            Self::EmptyDescription => "Provide a building description.".to_string(),
            Self::Generation(GenerationError::Network(_)) => {
                "Generation service unreachable.".to_string()
            }
            Self::Generation(GenerationError::Service { .. }) => {
                "Generation service rejected the request.".to_string()
            }
            Self::Generation(GenerationError::MalformedResponse(_)) => {
                "Generation service returned an unusable response.".to_string()
            }
            Self::Parse(_) => "Generated structure could not be read.".to_string(),
            Self::Persist(_) => "Failed to save schematic.".to_string(),
            Self::ForegroundClosed | Self::TaskFailed(_) => {
                "Unexpected error - check server console.".to_string()
            }
        }
    }

    /// Whether the actor can fix this by waiting or rephrasing
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Cooldown { .. } | Self::EmptyDescription)
    }
}
