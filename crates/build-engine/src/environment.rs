//! Live-environment capability
//!
//! The materializer only needs "set this block, within a budget". Hosts
//! adapt their world API to `Environment`; `InMemoryWorld` is the
//! recording implementation used by the CLI and tests.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::material::MaterialId;

/// Absolute block coordinate in the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Translate by a grid-local offset
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Why the environment refused a mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The per-operation change budget is used up
    #[error("Mutation budget of {limit} changes exhausted")]
    BudgetExhausted { limit: usize },
}

/// One bounded batch of mutations.
///
/// A session is opened per materialization and dropped when it ends;
/// the host's change budget applies to a single session.
pub trait EditSession {
    fn set_block(&mut self, pos: BlockPos, material: &MaterialId) -> Result<(), MutationError>;
}

/// A live environment that accepts block mutations.
///
/// Only ever touched from the foreground executor thread.
pub trait Environment: Send {
    /// Open an edit session for one operation
    fn edit_session(&mut self) -> Box<dyn EditSession + '_>;
}

/// Recording world kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    blocks: HashMap<BlockPos, MaterialId>,
    history: Vec<(BlockPos, MaterialId)>,
    max_changes: Option<usize>,
}

impl InMemoryWorld {
    /// World without a change budget
    pub fn new() -> Self {
        Self::default()
    }

    /// World allowing at most `max_changes` mutations per session
    pub fn with_budget(max_changes: usize) -> Self {
        Self {
            max_changes: Some(max_changes),
            ..Self::default()
        }
    }

    /// Current block at `pos`, if any was set
    pub fn block_at(&self, pos: BlockPos) -> Option<&MaterialId> {
        self.blocks.get(&pos)
    }

    /// Number of distinct positions holding a block
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Every accepted mutation, in application order
    pub fn history(&self) -> &[(BlockPos, MaterialId)] {
        &self.history
    }
}

impl Environment for InMemoryWorld {
    fn edit_session(&mut self) -> Box<dyn EditSession + '_> {
        Box::new(InMemorySession {
            world: self,
            changed: 0,
        })
    }
}

struct InMemorySession<'w> {
    world: &'w mut InMemoryWorld,
    changed: usize,
}

impl EditSession for InMemorySession<'_> {
    fn set_block(&mut self, pos: BlockPos, material: &MaterialId) -> Result<(), MutationError> {
        if let Some(limit) = self.world.max_changes {
            if self.changed >= limit {
                return Err(MutationError::BudgetExhausted { limit });
            }
        }
        self.changed += 1;
        self.world.blocks.insert(pos, material.clone());
        self.world.history.push((pos, material.clone()));
        Ok(())
    }
}
