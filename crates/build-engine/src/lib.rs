//! Build engine - from generated text to placed blocks
//!
//! This crate takes raw generation output and turns it into something
//! real:
//!
//! - `GridValidator`: untrusted JSON to a bounded, immutable `CanonicalGrid`
//! - `materialize`: apply a grid to an `Environment`, or save it as a
//!   Sponge schematic
//! - `BuildCoordinator`: per-actor cooldowns, background generation and
//!   the handoff to the single `ForegroundExecutor`
//!
//! # Example
//!
//! ```ignore
//! use build_engine::{BuildCoordinator, BuildRequest, CooldownTracker, ForegroundExecutor,
//!     ForegroundState, InMemoryWorld, LogNoticeSink};
//!
//! let executor = ForegroundExecutor::start(ForegroundState::new(InMemoryWorld::new(), LogNoticeSink))?;
//! let coordinator = BuildCoordinator::new(config, Some(backend), CooldownTracker::new(window),
//!     executor.handle(), tokio::runtime::Handle::current());
//!
//! let outcome = coordinator.submit(BuildRequest::save(actor, "a stone bridge"))?.outcome().await?;
//! ```

pub mod actor;
pub mod cooldown;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod foreground;
pub mod grid;
pub mod material;
pub mod materialize;
pub mod notice;
pub mod schematic;

/// Directory schematics are written to unless configured otherwise
pub const DEFAULT_SCHEMATICS_DIR: &str = "schematics";

// Re-export key types
pub use actor::{ActorDirectory, ActorId};
pub use cooldown::{Clock, CooldownTracker, ManualClock, SystemClock};
pub use coordinator::{BuildCoordinator, BuildHandle, BuildMode, BuildOutcome, BuildRequest, BuildStage};
pub use environment::{BlockPos, EditSession, Environment, InMemoryWorld, MutationError};
pub use error::{BuildError, GridError, PersistError, Result};
pub use foreground::{ForegroundExecutor, ForegroundHandle, ForegroundState};
pub use grid::{CanonicalGrid, Cell, GridSummary, GridValidator};
pub use material::{MaterialCatalog, MaterialId};
pub use materialize::{apply_direct, persist, MaterializationResult, SavedSchematic};
pub use notice::{LogNoticeSink, Notice, NoticeError, NoticeKind, NoticeSink, NullNoticeSink, VecNoticeSink};
