//! Command handlers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use build_engine::schematic::{self, FILE_EXTENSION};
use build_engine::{
    ActorId, BuildCoordinator, BuildError, BuildOutcome, BuildRequest, CooldownTracker, ForegroundExecutor,
    ForegroundState, GridError, GridSummary, GridValidator, InMemoryWorld, LogNoticeSink,
    MaterializationResult, PersistError,
};
use generation::{build_system_prompt, GeminiBackend, GenerationBackend, GenerationError, ReplayBackend};
use serde::Serialize;
use tokio::runtime::Handle;

use crate::cli::{GenerateArgs, InspectArgs};
use crate::config::{AppConfig, ConfigError};
use crate::constants::{defaults, env, paths};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start foreground executor: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Config already exists at '{0}' (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("Unsupported file type: '{0}'")]
    UnsupportedFile(PathBuf),
}

/// Copies every generated document to a file before handing it on
struct DumpingBackend {
    inner: Arc<dyn GenerationBackend>,
    path: PathBuf,
}

#[async_trait]
impl GenerationBackend for DumpingBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn generate(&self, system_instruction: &str, user_text: &str) -> Result<String, GenerationError> {
        let text = self.inner.generate(system_instruction, user_text).await?;
        match tokio::fs::write(&self.path, &text).await {
            Ok(()) => log::info!("Wrote generated document to {}", self.path.display()),
            Err(e) => log::warn!("Could not write {}: {}", self.path.display(), e),
        }
        Ok(text)
    }
}

/// Pick the backend for this run; `None` when nothing is configured
fn select_backend(
    config: &AppConfig,
    args: &GenerateArgs,
) -> Result<Option<Arc<dyn GenerationBackend>>, CommandError> {
    let backend: Arc<dyn GenerationBackend> = match (&args.from_file, config.client_settings()) {
        (Some(path), _) => {
            let replay = ReplayBackend::from_file(path).map_err(|source| CommandError::Read {
                path: path.clone(),
                source,
            })?;
            Arc::new(replay)
        }
        (None, Some(settings)) => Arc::new(GeminiBackend::new(settings)?),
        (None, None) => {
            log::warn!("No generation API key configured (set {})", env::API_KEY);
            return Ok(None);
        }
    };

    let backend: Arc<dyn GenerationBackend> = match &args.dump_json {
        Some(path) => Arc::new(DumpingBackend {
            inner: backend,
            path: path.clone(),
        }),
        None => backend,
    };
    Ok(Some(backend))
}

pub async fn generate(config: &AppConfig, args: GenerateArgs) -> Result<(), CommandError> {
    let backend = select_backend(config, &args)?;

    let world = match config.mutation_budget {
        Some(budget) => InMemoryWorld::with_budget(budget),
        None => InMemoryWorld::new(),
    };
    let executor = ForegroundExecutor::start(ForegroundState::new(world, LogNoticeSink))
        .map_err(CommandError::Spawn)?;

    let actor = ActorId::new();
    executor
        .handle()
        .run(move |state| state.actors_mut().join(actor, defaults::ACTOR_NAME))
        .await?;

    let coordinator = BuildCoordinator::new(
        config.generation_config(),
        backend,
        CooldownTracker::new(config.cooldown()),
        executor.handle(),
        Handle::current(),
    )
    .with_catalog(config.catalog())
    .with_schematics_dir(config.schematics_dir.clone());

    let description = args.description();
    let request = if args.save {
        BuildRequest::save(actor, description)
    } else {
        BuildRequest::place(actor, description, args.origin)
    };

    let result = match coordinator.submit(request) {
        Ok(handle) => {
            log::debug!("Waiting for request {}", handle.request_id());
            handle.outcome().await
        }
        Err(e) => Err(e),
    };
    let state = executor.shutdown()?;

    match result? {
        BuildOutcome::Completed(MaterializationResult::Placed {
            name,
            applied,
            requested,
        }) => {
            println!(
                "Placed {} of {} blocks ({}); world now holds {} blocks",
                applied,
                requested,
                name,
                state.world().block_count()
            );
        }
        BuildOutcome::Completed(MaterializationResult::Saved { written, path }) => {
            println!("Saved {} blocks to {}", written, path.display());
        }
        BuildOutcome::ActorGone => println!("Request discarded"),
    }
    Ok(())
}

/// Summary of either a schematic or a structure document
#[derive(Debug, Serialize)]
struct FileSummary {
    name: String,
    dimensions: (u32, u32, u32),
    blocks: usize,
    materials: Vec<(String, usize)>,
}

impl From<GridSummary> for FileSummary {
    fn from(summary: GridSummary) -> Self {
        Self {
            name: summary.name,
            dimensions: summary.dimensions,
            blocks: summary.cell_count,
            materials: summary
                .materials
                .into_iter()
                .map(|(id, count)| (id.to_string(), count))
                .collect(),
        }
    }
}

fn summarize(config: &AppConfig, path: &Path) -> Result<FileSummary, CommandError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    if extension.eq_ignore_ascii_case(FILE_EXTENSION) {
        let contents = schematic::read_schematic(path)?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for id in contents.blocks.values() {
            *counts.entry(id.as_str()).or_default() += 1;
        }
        let mut materials: Vec<(String, usize)> =
            counts.into_iter().map(|(id, n)| (id.to_string(), n)).collect();
        materials.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        return Ok(FileSummary {
            name: contents.name.unwrap_or_else(|| "(unnamed)".to_string()),
            dimensions: (contents.width, contents.height, contents.length),
            blocks: contents.blocks.len(),
            materials,
        });
    }

    if extension.eq_ignore_ascii_case(paths::JSON_EXTENSION) {
        let raw = std::fs::read_to_string(path).map_err(|source| CommandError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let grid = GridValidator::new(&config.generation_config()).validate(&raw)?;
        return Ok(grid.summary().into());
    }

    Err(CommandError::UnsupportedFile(path.to_path_buf()))
}

pub fn inspect(config: &AppConfig, args: InspectArgs) -> Result<(), CommandError> {
    let summary = summarize(config, &args.path)?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)?;
        println!("{}", json);
        return Ok(());
    }

    let (x, y, z) = summary.dimensions;
    println!();
    println!("  Name:       {}", summary.name);
    println!("  Dimensions: {} x {} x {}", x, y, z);
    println!(
        "  Blocks:     {} total, {} types",
        summary.blocks,
        summary.materials.len()
    );
    println!();
    for (id, count) in &summary.materials {
        let short = id.strip_prefix("minecraft:").unwrap_or(id);
        println!("    {:30} {:>5}", short, count);
    }
    println!();
    Ok(())
}

pub fn prompt(config: &AppConfig) {
    println!("{}", build_system_prompt(&config.generation_config()));
}

pub async fn init_config(config_dir: &Path, force: bool) -> Result<(), CommandError> {
    let path = config_dir.join(paths::CONFIG_FILE);
    if path.exists() && !force {
        return Err(CommandError::ConfigExists(path));
    }
    let written = AppConfig::default().save(config_dir).await?;
    println!("Wrote {}", written.display());
    Ok(())
}
