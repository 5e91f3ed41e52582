//! Application configuration storage
//!
//! Handles persistent storage of the generation credential, structure
//! limits, rate limiting and the block palette.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use build_engine::{MaterialCatalog, DEFAULT_SCHEMATICS_DIR};
use generation::constants::{defaults as gen_defaults, timeouts};
use generation::{BoundsCheck, ClientSettings, GenerationConfig};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{defaults, paths};

/// Generation service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; `None`, empty or the placeholder means not configured
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: Some(defaults::API_KEY_PLACEHOLDER.to_string()),
            model: gen_defaults::MODEL.to_string(),
            base_url: gen_defaults::BASE_URL.to_string(),
            connect_timeout_secs: timeouts::CONNECT_SECS,
            request_timeout_secs: timeouts::REQUEST_SECS,
            temperature: gen_defaults::TEMPERATURE,
        }
    }
}

/// Structure size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub max_depth: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_width: gen_defaults::MAX_WIDTH,
            max_height: gen_defaults::MAX_HEIGHT,
            max_depth: gen_defaults::MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub cooldown_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: defaults::COOLDOWN_SECS,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
    /// Blocks offered to the model, grouped by category.
    /// Flattened in category-name order; empty means unrestricted.
    pub palette: BTreeMap<String, Vec<String>>,
    /// Restrict placement to palette blocks (others become stone)
    pub restrict_to_palette: bool,
    pub schematics_dir: PathBuf,
    pub bounds_check: BoundsCheck,
    /// Maximum block changes per placement; `None` for no limit
    pub mutation_budget: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            limits: LimitsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            palette: default_palette(),
            restrict_to_palette: false,
            schematics_dir: PathBuf::from(DEFAULT_SCHEMATICS_DIR),
            bounds_check: BoundsCheck::default(),
            mutation_budget: None,
        }
    }
}

fn default_palette() -> BTreeMap<String, Vec<String>> {
    let group = |ids: &[&str]| ids.iter().map(|id| format!("minecraft:{}", id)).collect();
    BTreeMap::from([
        (
            "structure".to_string(),
            group(&[
                "white_concrete",
                "light_gray_concrete",
                "gray_concrete",
                "quartz_block",
                "smooth_quartz",
                "stone_bricks",
                "polished_andesite",
                "smooth_stone",
                "stone_brick_slab",
            ]),
        ),
        (
            "glass".to_string(),
            group(&["glass", "light_gray_stained_glass", "light_blue_stained_glass"]),
        ),
        ("detail".to_string(), group(&["dark_oak_planks", "iron_bars"])),
        ("lighting".to_string(), group(&["sea_lantern", "glowstone"])),
    ])
}

impl AppConfig {
    /// Default location: `<platform config dir>/blockwright`
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(paths::APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load configuration from disk; a missing file yields the defaults
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(paths::CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("No config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<PathBuf, ConfigError> {
        fs::create_dir_all(config_dir).await?;

        let config_path = config_dir.join(paths::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(config_path)
    }

    /// Replace the file's key with an environment-provided one, if set
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.gemini.api_key = Some(key);
        }
        self
    }

    /// The usable API key, if any
    pub fn api_key(&self) -> Option<&str> {
        self.gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != defaults::API_KEY_PLACEHOLDER)
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::from_categories(
            self.palette.clone(),
            self.limits.max_width,
            self.limits.max_height,
            self.limits.max_depth,
        )
        .with_bounds_check(self.bounds_check)
    }

    /// Client settings, or `None` without a usable key
    pub fn client_settings(&self) -> Option<ClientSettings> {
        let key = self.api_key()?;
        let mut settings = ClientSettings::new(key)
            .with_model(self.gemini.model.clone())
            .with_base_url(self.gemini.base_url.clone())
            .with_timeouts(
                Duration::from_secs(self.gemini.connect_timeout_secs),
                Duration::from_secs(self.gemini.request_timeout_secs),
            );
        settings.temperature = self.gemini.temperature;
        Some(settings)
    }

    pub fn catalog(&self) -> MaterialCatalog {
        if self.restrict_to_palette {
            MaterialCatalog::known(self.palette.values().flatten())
        } else {
            MaterialCatalog::permissive()
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit.cooldown_seconds)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_engine::MaterialId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.limits.max_height, 64);
        assert_eq!(config.rate_limit.cooldown_seconds, 30);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("cfg");

        let mut config = AppConfig::default();
        config.limits.max_width = 12;
        config.bounds_check = BoundsCheck::ConfiguredMaximum;
        config.mutation_budget = Some(500);
        let path = config.save(&nested).await.unwrap();
        assert!(path.ends_with("config.json"));

        let loaded = AppConfig::load(&nested).await.unwrap();
        assert_eq!(loaded.limits.max_width, 12);
        assert_eq!(loaded.bounds_check, BoundsCheck::ConfiguredMaximum);
        assert_eq!(loaded.mutation_budget, Some(500));
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"limits":{"max_width":8},"palette":{}}"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.limits.max_width, 8);
        assert_eq!(config.limits.max_depth, 48);
        assert!(config.generation_config().palette().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(dir.path()).await,
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_placeholder_key_is_missing() {
        let config = AppConfig::default();
        assert_eq!(config.api_key(), None);
        assert!(config.client_settings().is_none());

        let config = config.with_api_key_override(Some("real-key".to_string()));
        assert_eq!(config.api_key(), Some("real-key"));
        assert_eq!(config.client_settings().unwrap().api_key, "real-key");
    }

    #[test]
    fn test_empty_override_keeps_file_key() {
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("from-file".to_string());
        let config = config.with_api_key_override(Some("  ".to_string()));
        assert_eq!(config.api_key(), Some("from-file"));
    }

    #[test]
    fn test_palette_flattened_in_category_order() {
        let mut config = AppConfig::default();
        config.palette = BTreeMap::from([
            ("b_walls".to_string(), vec!["minecraft:stone_bricks".to_string()]),
            ("a_glass".to_string(), vec!["minecraft:glass".to_string()]),
        ]);
        assert_eq!(
            config.generation_config().palette(),
            ["minecraft:glass", "minecraft:stone_bricks"]
        );
    }

    #[test]
    fn test_restricted_catalog() {
        let mut config = AppConfig::default();
        config.restrict_to_palette = true;
        let catalog = config.catalog();
        let gold = MaterialId::sanitize("minecraft:gold_block");
        assert_eq!(catalog.resolve(&gold), MaterialId::fallback());
        let glass = MaterialId::sanitize("minecraft:glass");
        assert_eq!(catalog.resolve(&glass), glass);
    }
}
