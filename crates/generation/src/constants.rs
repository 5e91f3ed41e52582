//! Generation-wide constants
//!
//! Single source of truth for service endpoints, limits and timeouts.

/// Default values for generation configuration
pub mod defaults {
    /// Default Gemini model identifier
    pub const MODEL: &str = "gemini-2.0-flash";
    /// Default Gemini API host
    pub const BASE_URL: &str = "https://generativelanguage.googleapis.com";
    /// Sampling temperature sent with every request
    pub const TEMPERATURE: f32 = 0.7;
    /// Response mime type requested from the service
    pub const RESPONSE_MIME_TYPE: &str = "application/json";
    /// Maximum structure width (x axis)
    pub const MAX_WIDTH: u32 = 48;
    /// Maximum structure height (y axis)
    pub const MAX_HEIGHT: u32 = 64;
    /// Maximum structure depth (z axis)
    pub const MAX_DEPTH: u32 = 48;
    /// Upper bound for any configured maximum; schematic sides are shorts
    pub const MAX_SIDE: u32 = i16::MAX as u32;
}

/// Timeout configuration (in seconds)
pub mod timeouts {
    /// Time allowed to establish the connection
    pub const CONNECT_SECS: u64 = 10;
    /// Time allowed for the whole request, generation included
    pub const REQUEST_SECS: u64 = 60;
}

/// Material identifier conventions
pub mod materials {
    /// Namespace every accepted material identifier must carry
    pub const NAMESPACE_PREFIX: &str = "minecraft:";
    /// Identifier substituted for anything outside the namespace
    pub const FALLBACK: &str = "minecraft:stone";
    /// Marker used in the prompt when no palette is configured
    pub const UNRESTRICTED_PALETTE: &str = "any standard Minecraft blocks";
}
