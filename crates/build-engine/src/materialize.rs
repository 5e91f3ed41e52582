//! Turning a validated grid into blocks
//!
//! Two sinks: direct mutation of a live environment (foreground only),
//! or a schematic file on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::environment::{BlockPos, Environment, MutationError};
use crate::error::PersistError;
use crate::grid::CanonicalGrid;
use crate::material::MaterialCatalog;
use crate::schematic::{self, BlockBuffer, FILE_EXTENSION};

/// What a completed materialization did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MaterializationResult {
    /// Blocks applied to the environment; `applied < requested` when the
    /// mutation budget ran out
    Placed {
        name: String,
        applied: usize,
        requested: usize,
    },
    /// Blocks written to a schematic file
    Saved { written: usize, path: PathBuf },
}

/// A schematic written by `persist`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSchematic {
    pub written: usize,
    pub path: PathBuf,
}

impl From<SavedSchematic> for MaterializationResult {
    fn from(saved: SavedSchematic) -> Self {
        Self::Saved {
            written: saved.written,
            path: saved.path,
        }
    }
}

/// Apply every cell at `origin + (x, y, z)` in grid order.
///
/// Returns how many mutations the environment accepted. Hitting the
/// environment's budget ends the pass early and is not an error.
pub fn apply_direct(
    grid: CanonicalGrid,
    origin: BlockPos,
    env: &mut dyn Environment,
    catalog: &MaterialCatalog,
) -> usize {
    let requested = grid.cell_count();
    let name = grid.name().to_string();
    let mut session = env.edit_session();
    let mut applied = 0;

    for cell in grid.into_cells() {
        let material = catalog.resolve(&cell.material);
        let pos = origin.offset(cell.x, cell.y, cell.z);
        match session.set_block(pos, &material) {
            Ok(()) => applied += 1,
            Err(MutationError::BudgetExhausted { limit }) => {
                log::warn!(
                    "Mutation budget of {} reached placing '{}': {} of {} blocks applied",
                    limit,
                    name,
                    applied,
                    requested
                );
                break;
            }
        }
    }

    log::debug!("Applied {} blocks of '{}' at {}", applied, name, origin);
    applied
}

/// Write the grid as a gzip Sponge schematic under `dir`.
///
/// The region is exactly the grid dimensions. Later cells at the same
/// position override earlier ones; cells outside the region are skipped.
/// Air cells count as written but read back as empty positions.
pub fn persist(
    grid: CanonicalGrid,
    dir: &Path,
    catalog: &MaterialCatalog,
) -> Result<SavedSchematic, PersistError> {
    let (width, height, length) = grid.dimensions();
    let mut buffer = BlockBuffer::new(width, height, length)?;

    let name = grid.name().to_string();
    let mut written = 0;
    let mut skipped = 0;
    for cell in grid.cells() {
        if buffer.set(cell.x, cell.y, cell.z, &catalog.resolve(&cell.material)) {
            written += 1;
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        log::debug!(
            "Skipped {} cells of '{}' outside the {}x{}x{} region",
            skipped,
            name,
            width,
            height,
            length
        );
    }

    std::fs::create_dir_all(dir).map_err(|e| PersistError::io(dir, e))?;
    let path = dir.join(format!("{}.{}", sanitize_file_name(&name), FILE_EXTENSION));
    schematic::write_schematic(&buffer, &name, &path)?;

    log::info!("Saved {} blocks of '{}' to {}", written, name, path.display());
    Ok(SavedSchematic { written, path })
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        crate::grid::DEFAULT_NAME.to_string()
    } else {
        sanitized
    }
}
