//! Configuration types for the generation pipeline

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Which bound the grid validator checks cell coordinates against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundsCheck {
    /// Cells must lie inside the grid's own (clamped) dimensions
    #[default]
    DeclaredDimensions,
    /// Cells must lie inside the configured maxima, even when the grid
    /// declares smaller dimensions
    ConfiguredMaximum,
}

/// Immutable limits and palette for one pipeline lifetime.
///
/// The palette is ordered; an empty palette means the service may use
/// any block. Maxima are always between 1 and `defaults::MAX_SIDE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    palette: Vec<String>,
    max_width: u32,
    max_height: u32,
    max_depth: u32,
    bounds_check: BoundsCheck,
}

impl GenerationConfig {
    /// Create a config from a flat palette and the three maxima
    pub fn new(palette: Vec<String>, max_width: u32, max_height: u32, max_depth: u32) -> Self {
        Self {
            palette,
            max_width: clamp_side(max_width),
            max_height: clamp_side(max_height),
            max_depth: clamp_side(max_depth),
            bounds_check: BoundsCheck::default(),
        }
    }

    /// Create a config from a palette grouped by category.
    ///
    /// Categories are flattened in iteration order, entries within a
    /// category keep their order.
    pub fn from_categories<I, S>(categories: I, max_width: u32, max_height: u32, max_depth: u32) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
    {
        let palette = categories
            .into_iter()
            .flat_map(|(_, blocks)| blocks)
            .collect();
        Self::new(palette, max_width, max_height, max_depth)
    }

    /// Select the bound used by the grid validator
    pub fn with_bounds_check(mut self, bounds_check: BoundsCheck) -> Self {
        self.bounds_check = bounds_check;
        self
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn bounds_check(&self) -> BoundsCheck {
        self.bounds_check
    }
}

fn clamp_side(value: u32) -> u32 {
    let clamped = value.clamp(1, defaults::MAX_SIDE);
    if clamped != value {
        log::warn!("Structure maximum {} out of range, using {}", value, clamped);
    }
    clamped
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(
            Vec::new(),
            defaults::MAX_WIDTH,
            defaults::MAX_HEIGHT,
            defaults::MAX_DEPTH,
        )
    }
}
