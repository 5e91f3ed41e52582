//! System instruction assembly
//!
//! The instruction is a fixed template; only the palette and the three
//! maxima vary, so the same config always yields the same text.

use crate::config::GenerationConfig;
use crate::constants::materials;

const SYSTEM_TEMPLATE: &str = r#"You are a Minecraft building generator. You output ONLY valid JSON - no markdown, no explanation, no commentary.

Given a building description, generate a 3D block grid as a JSON object with this exact schema:

{
  "name": "string: short building name",
  "dimensions": { "x": int, "y": int, "z": int },
  "blocks": [
    { "x": int, "y": int, "z": int, "block": "minecraft:block_id" }
  ]
}

CONSTRAINTS:
- Y is vertical (up). Ground level is y=0.
- Only use blocks from this palette: {palette}
- Maximum dimensions: {width}x{height}x{depth} blocks (width x height x depth)
- Omit air blocks - only include solid blocks
- Use minecraft: namespaced block IDs (e.g., "minecraft:white_concrete")
- Buildings should be structurally plausible (walls, floors, roof, windows)
- Interior floors should have open space (rooms, not solid fill)
- Ground floor should be slightly larger or differentiated (lobby, entrance)

OUTPUT ONLY THE JSON OBJECT. No other text."#;

/// A system instruction paired with the actor's description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    system_instruction: String,
    user_text: String,
}

impl Prompt {
    /// Build a prompt for `user_text` under the given limits
    pub fn new(config: &GenerationConfig, user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: build_system_prompt(config),
            user_text: user_text.into(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }
}

/// Render the system instruction for a config
pub fn build_system_prompt(config: &GenerationConfig) -> String {
    let palette = if config.palette().is_empty() {
        materials::UNRESTRICTED_PALETTE.to_string()
    } else {
        config.palette().join(", ")
    };

    SYSTEM_TEMPLATE
        .replace("{palette}", &palette)
        .replace("{width}", &config.max_width().to_string())
        .replace("{height}", &config.max_height().to_string())
        .replace("{depth}", &config.max_depth().to_string())
}
