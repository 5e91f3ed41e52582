//! Canonical grid and the validator that builds it
//!
//! The generation service's text is untrusted. Validation never rejects a
//! structure for being too large: dimensions are clamped, out-of-range
//! cells are dropped, and unknown materials are replaced. Only text that
//! is not a JSON object with a `blocks` array fails.

use std::collections::HashMap;

use generation::{BoundsCheck, GenerationConfig};
use serde::Serialize;
use serde_json::Value;

use crate::error::GridError;
use crate::material::MaterialId;

/// Name used when the document has none
pub const DEFAULT_NAME: &str = "Unnamed";

/// One block of the structure, in grid-local coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub material: MaterialId,
}

/// Validated, bounded, immutable structure geometry.
///
/// Fields are private and there is no mutating API; a grid is built once
/// by the validator and then moved into the materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalGrid {
    name: String,
    dim_x: u32,
    dim_y: u32,
    dim_z: u32,
    cells: Vec<Cell>,
}

impl CanonicalGrid {
    /// Parse with the default bounds check and the given maxima
    pub fn parse(
        raw: &str,
        max_width: u32,
        max_height: u32,
        max_depth: u32,
    ) -> Result<Self, GridError> {
        GridValidator::new(&GenerationConfig::new(
            Vec::new(),
            max_width,
            max_height,
            max_depth,
        ))
        .validate(raw)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim_x(&self) -> u32 {
        self.dim_x
    }

    pub fn dim_y(&self) -> u32 {
        self.dim_y
    }

    pub fn dim_z(&self) -> u32 {
        self.dim_z
    }

    /// `(x, y, z)` dimensions
    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.dim_x, self.dim_y, self.dim_z)
    }

    /// Cells in input order, duplicates included
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Whether a coordinate lies inside the declared dimensions
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        in_range(x as i64, self.dim_x)
            && in_range(y as i64, self.dim_y)
            && in_range(z as i64, self.dim_z)
    }

    /// Material counts, most common first
    pub fn summary(&self) -> GridSummary {
        let mut counts: HashMap<&MaterialId, usize> = HashMap::new();
        for cell in &self.cells {
            *counts.entry(&cell.material).or_default() += 1;
        }

        let mut materials: Vec<(MaterialId, usize)> = counts
            .into_iter()
            .map(|(id, count)| (id.clone(), count))
            .collect();
        materials.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        GridSummary {
            name: self.name.clone(),
            dimensions: self.dimensions(),
            cell_count: self.cells.len(),
            materials,
        }
    }
}

/// Per-material statistics for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub name: String,
    pub dimensions: (u32, u32, u32),
    pub cell_count: usize,
    pub materials: Vec<(MaterialId, usize)>,
}

/// Turns raw generation output into a `CanonicalGrid`
#[derive(Debug, Clone)]
pub struct GridValidator {
    max_width: u32,
    max_height: u32,
    max_depth: u32,
    bounds_check: BoundsCheck,
}

impl GridValidator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            max_width: config.max_width(),
            max_height: config.max_height(),
            max_depth: config.max_depth(),
            bounds_check: config.bounds_check(),
        }
    }

    pub fn validate(&self, raw: &str) -> Result<CanonicalGrid, GridError> {
        let root: Value = serde_json::from_str(raw)?;
        let root = root.as_object().ok_or(GridError::MissingField("a top-level object"))?;

        let name = root
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_string();

        let dims = root.get("dimensions").and_then(Value::as_object);
        let axis = |key: &str, max: u32| -> u32 {
            dims.and_then(|dims| dims.get(key))
                .and_then(as_int)
                .map(|requested| requested.clamp(0, max as i64) as u32)
                .unwrap_or(max)
        };
        let dim_x = axis("x", self.max_width);
        let dim_y = axis("y", self.max_height);
        let dim_z = axis("z", self.max_depth);

        let blocks = root
            .get("blocks")
            .and_then(Value::as_array)
            .ok_or(GridError::MissingField("a \"blocks\" array"))?;

        let (bound_x, bound_y, bound_z) = match self.bounds_check {
            BoundsCheck::DeclaredDimensions => (dim_x, dim_y, dim_z),
            BoundsCheck::ConfiguredMaximum => (self.max_width, self.max_height, self.max_depth),
        };

        let mut cells = Vec::with_capacity(blocks.len());
        let mut dropped = 0usize;
        for entry in blocks {
            let Some((x, y, z, block)) = read_entry(entry) else {
                dropped += 1;
                continue;
            };

            if !in_range(x, bound_x) || !in_range(y, bound_y) || !in_range(z, bound_z) {
                dropped += 1;
                continue;
            }

            cells.push(Cell {
                x: x as i32,
                y: y as i32,
                z: z as i32,
                material: MaterialId::sanitize(block),
            });
        }

        if dropped > 0 {
            log::debug!(
                "Dropped {} of {} cells from '{}' (outside {}x{}x{} or malformed)",
                dropped,
                blocks.len(),
                name,
                bound_x,
                bound_y,
                bound_z
            );
        }

        Ok(CanonicalGrid {
            name,
            dim_x,
            dim_y,
            dim_z,
            cells,
        })
    }
}

fn in_range(value: i64, bound: u32) -> bool {
    value >= 0 && value < bound as i64
}

/// Integer view of a JSON value; floats truncate, numeric strings parse
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_entry(entry: &Value) -> Option<(i64, i64, i64, &str)> {
    let entry = entry.as_object()?;
    Some((
        as_int(entry.get("x")?)?,
        as_int(entry.get("y")?)?,
        as_int(entry.get("z")?)?,
        entry.get("block")?.as_str()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(max: (u32, u32, u32), bounds_check: BoundsCheck) -> GridValidator {
        GridValidator::new(
            &GenerationConfig::new(Vec::new(), max.0, max.1, max.2).with_bounds_check(bounds_check),
        )
    }

    #[test]
    fn test_negative_coordinate_dropped() {
        let grid = CanonicalGrid::parse(
            r#"{"blocks":[{"x":-1,"y":0,"z":0,"block":"minecraft:stone"}]}"#,
            10,
            10,
            10,
        )
        .unwrap();
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_missing_namespace_uses_fallback() {
        let grid = CanonicalGrid::parse(
            r#"{"blocks":[{"x":1,"y":1,"z":1,"block":"dirt"}]}"#,
            10,
            10,
            10,
        )
        .unwrap();
        assert_eq!(grid.cell_count(), 1);
        assert_eq!(grid.cells()[0].material, MaterialId::fallback());
        assert_eq!(grid.cells()[0].material.as_str(), "minecraft:stone");
    }

    #[test]
    fn test_defaults_without_name_or_dimensions() {
        let grid = CanonicalGrid::parse(r#"{"blocks":[]}"#, 48, 64, 48).unwrap();
        assert_eq!(grid.name(), "Unnamed");
        assert_eq!(grid.dimensions(), (48, 64, 48));

        let grid = CanonicalGrid::parse(r#"{"name":"  ","blocks":[]}"#, 4, 4, 4).unwrap();
        assert_eq!(grid.name(), "Unnamed");
    }

    #[test]
    fn test_dimensions_are_clamped_never_rejected() {
        let grid = CanonicalGrid::parse(
            r#"{"name":"Tower","dimensions":{"x":500,"y":-3,"z":7},"blocks":[]}"#,
            48,
            64,
            48,
        )
        .unwrap();
        assert_eq!(grid.name(), "Tower");
        assert_eq!(grid.dimensions(), (48, 0, 7));
    }

    #[test]
    fn test_dimensions_within_limits_for_many_requests() {
        let maxima = [(1, 1, 1), (5, 9, 3), (48, 64, 48)];
        let requests = [-100i64, -1, 0, 1, 4, 47, 48, 64, 65, 10_000];
        for &(mw, mh, md) in &maxima {
            for &rx in &requests {
                for &ry in &requests {
                    let raw = format!(
                        r#"{{"dimensions":{{"x":{},"y":{},"z":{}}},"blocks":[]}}"#,
                        rx, ry, rx
                    );
                    let grid = CanonicalGrid::parse(&raw, mw, mh, md).unwrap();
                    assert!(grid.dim_x() <= mw && grid.dim_y() <= mh && grid.dim_z() <= md);
                }
            }
        }
    }

    #[test]
    fn test_missing_axis_defaults_to_maximum() {
        let grid =
            CanonicalGrid::parse(r#"{"dimensions":{"x":3},"blocks":[]}"#, 10, 20, 30).unwrap();
        assert_eq!(grid.dimensions(), (3, 20, 30));
    }

    #[test]
    fn test_missing_blocks_is_parse_failure() {
        let err = CanonicalGrid::parse(r#"{"name":"x"}"#, 10, 10, 10).unwrap_err();
        assert!(matches!(err, GridError::MissingField(_)));

        let err = CanonicalGrid::parse(r#"{"blocks":{}}"#, 10, 10, 10).unwrap_err();
        assert!(matches!(err, GridError::MissingField(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_failure() {
        let err = CanonicalGrid::parse("not json at all", 10, 10, 10).unwrap_err();
        assert!(matches!(err, GridError::InvalidJson(_)));

        let err = CanonicalGrid::parse("[1,2,3]", 10, 10, 10).unwrap_err();
        assert!(matches!(err, GridError::MissingField(_)));
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let grid = CanonicalGrid::parse(
            r#"{"blocks":[
                {"x":0,"y":0,"z":0,"block":"minecraft:glass"},
                {"x":1,"y":0,"z":0,"block":"minecraft:dirt"},
                {"x":0,"y":0,"z":0,"block":"minecraft:oak_planks"}
            ]}"#,
            4,
            4,
            4,
        )
        .unwrap();
        let ids: Vec<&str> = grid.cells().iter().map(|c| c.material.as_str()).collect();
        assert_eq!(ids, ["minecraft:glass", "minecraft:dirt", "minecraft:oak_planks"]);
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let grid = CanonicalGrid::parse(
            r#"{"blocks":[
                {"x":0,"y":0,"block":"minecraft:glass"},
                {"x":0,"y":0,"z":0,"block":7},
                "stone",
                {"x":1.9,"y":"2","z":0,"block":"minecraft:glass"}
            ]}"#,
            4,
            4,
            4,
        )
        .unwrap();
        assert_eq!(grid.cell_count(), 1);
        let cell = &grid.cells()[0];
        assert_eq!((cell.x, cell.y, cell.z), (1, 2, 0));
    }

    #[test]
    fn test_declared_dimensions_bound_cells() {
        let raw = r#"{"dimensions":{"x":2,"y":2,"z":2},"blocks":[
            {"x":1,"y":1,"z":1,"block":"minecraft:glass"},
            {"x":5,"y":1,"z":1,"block":"minecraft:glass"}
        ]}"#;

        let strict = validator((10, 10, 10), BoundsCheck::DeclaredDimensions)
            .validate(raw)
            .unwrap();
        assert_eq!(strict.cell_count(), 1);

        let loose = validator((10, 10, 10), BoundsCheck::ConfiguredMaximum)
            .validate(raw)
            .unwrap();
        assert_eq!(loose.cell_count(), 2);
        assert!(!loose.contains(5, 1, 1));
    }

    #[test]
    fn test_surviving_cells_within_maxima() {
        let mut blocks = Vec::new();
        for v in [-2, -1, 0, 3, 9, 10, 11, 64] {
            blocks.push(format!(
                r#"{{"x":{v},"y":{v},"z":{v},"block":"minecraft:glass"}}"#
            ));
        }
        let raw = format!(r#"{{"blocks":[{}]}}"#, blocks.join(","));

        for bounds in [BoundsCheck::DeclaredDimensions, BoundsCheck::ConfiguredMaximum] {
            let grid = validator((10, 12, 10), bounds).validate(&raw).unwrap();
            assert_eq!(grid.cell_count(), 3);
            for cell in grid.cells() {
                assert!((0..10).contains(&cell.x));
                assert!((0..12).contains(&cell.y));
                assert!((0..10).contains(&cell.z));
                assert!(cell.material.as_str().starts_with("minecraft:"));
            }
        }
    }

    #[test]
    fn test_summary_orders_by_count() {
        let grid = CanonicalGrid::parse(
            r#"{"name":"Hut","blocks":[
                {"x":0,"y":0,"z":0,"block":"minecraft:oak_planks"},
                {"x":1,"y":0,"z":0,"block":"minecraft:glass"},
                {"x":2,"y":0,"z":0,"block":"minecraft:oak_planks"}
            ]}"#,
            4,
            4,
            4,
        )
        .unwrap();
        let summary = grid.summary();
        assert_eq!(summary.cell_count, 3);
        assert_eq!(summary.materials[0].0.as_str(), "minecraft:oak_planks");
        assert_eq!(summary.materials[0].1, 2);
        assert_eq!(summary.materials[1].1, 1);
    }
}
