//! Application-wide constants
//!
//! Library defaults (model, limits, timeouts) live in `generation::constants`;
//! this module only holds what the command-line host adds.

/// Configuration file locations
pub mod paths {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "blockwright";
    /// Config file name inside the config directory
    pub const CONFIG_FILE: &str = "config.json";
    /// Extension of raw structure documents
    pub const JSON_EXTENSION: &str = "json";
}

/// Environment variables consulted at startup
pub mod env {
    /// Overrides `gemini.api_key` from the config file
    pub const API_KEY: &str = "GEMINI_API_KEY";
}

/// Default values for host configuration
pub mod defaults {
    /// Seconds between accepted requests per actor
    pub const COOLDOWN_SECS: u64 = 30;
    /// Shipped placeholder; treated as no key at all
    pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";
    /// Display name of the local actor
    pub const ACTOR_NAME: &str = "console";
}
