//! Request coordination
//!
//! A request moves through
//! `Received -> RateChecked -> Dispatched -> Generated -> Validated ->
//! Materializing -> Completed`, or ends in `Failed` at any stage.
//! Admission checks run on the caller's thread. Generation and
//! validation run on the tokio runtime. Materialization and every notice
//! run on the foreground executor.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use generation::{GenerationBackend, GenerationConfig, Prompt};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::actor::ActorId;
use crate::cooldown::CooldownTracker;
use crate::environment::{BlockPos, Environment};
use crate::error::{BuildError, Result};
use crate::foreground::ForegroundHandle;
use crate::grid::{CanonicalGrid, GridValidator};
use crate::materialize::{self, MaterializationResult};
use crate::material::MaterialCatalog;
use crate::notice::Notice;

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Received,
    RateChecked,
    Dispatched,
    Generated,
    Validated,
    Materializing,
    Completed,
    Failed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::RateChecked => "rate_checked",
            Self::Dispatched => "dispatched",
            Self::Generated => "generated",
            Self::Validated => "validated",
            Self::Materializing => "materializing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the structure should be materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BuildMode {
    /// Mutate the environment with the grid's origin at `origin`
    Place { origin: BlockPos },
    /// Write a schematic file
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub actor: ActorId,
    pub description: String,
    pub mode: BuildMode,
}

impl BuildRequest {
    pub fn place(actor: ActorId, description: impl Into<String>, origin: BlockPos) -> Self {
        Self {
            actor,
            description: description.into(),
            mode: BuildMode::Place { origin },
        }
    }

    pub fn save(actor: ActorId, description: impl Into<String>) -> Self {
        Self {
            actor,
            description: description.into(),
            mode: BuildMode::Save,
        }
    }
}

/// How an admitted request ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Completed(MaterializationResult),
    /// The actor left before materialization; nothing was changed
    ActorGone,
}

/// A request in flight
#[derive(Debug)]
pub struct BuildHandle {
    request_id: Uuid,
    task: JoinHandle<Result<BuildOutcome>>,
}

impl BuildHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the request to finish
    pub async fn outcome(self) -> Result<BuildOutcome> {
        self.task
            .await
            .map_err(|e| BuildError::TaskFailed(e.to_string()))?
    }
}

/// Admits build requests and drives them to completion
pub struct BuildCoordinator<W> {
    config: Arc<GenerationConfig>,
    backend: Option<Arc<dyn GenerationBackend>>,
    cooldowns: Arc<CooldownTracker>,
    foreground: ForegroundHandle<W>,
    catalog: Arc<MaterialCatalog>,
    schematics_dir: PathBuf,
    runtime: Handle,
}

impl<W: Environment + 'static> BuildCoordinator<W> {
    /// `backend` is `None` when no generation credential is configured;
    /// every request is then refused.
    pub fn new(
        config: GenerationConfig,
        backend: Option<Arc<dyn GenerationBackend>>,
        cooldowns: CooldownTracker,
        foreground: ForegroundHandle<W>,
        runtime: Handle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            cooldowns: Arc::new(cooldowns),
            foreground,
            catalog: Arc::new(MaterialCatalog::default()),
            schematics_dir: PathBuf::from(crate::DEFAULT_SCHEMATICS_DIR),
            runtime,
        }
    }

    pub fn with_catalog(mut self, catalog: MaterialCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_schematics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schematics_dir = dir.into();
        self
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Admit a request and start it in the background.
    ///
    /// Refusals are returned here and also reported to the actor through
    /// the foreground. An admitted request has already used the actor's
    /// cooldown slot, whatever happens to it later.
    pub fn submit(&self, request: BuildRequest) -> Result<BuildHandle> {
        let request_id = Uuid::new_v4();
        let actor = request.actor;
        log::info!(
            "[{}] {} for {}: {:?}",
            request_id,
            BuildStage::Received,
            actor,
            request.description
        );

        let backend = match self.admit(&request) {
            Ok(backend) => backend,
            Err(e) => {
                log::info!("[{}] {}: {}", request_id, BuildStage::Failed, e);
                self.report(actor, &e);
                return Err(e);
            }
        };
        log::debug!("[{}] {}", request_id, BuildStage::RateChecked);

        let description = request.description.trim().to_string();
        let notice = Notice::info(actor, format!("Generating: {}", description));
        self.foreground.submit(move |state| {
            state.notify(notice);
        })?;

        let pipeline = Pipeline {
            request_id,
            config: Arc::clone(&self.config),
            backend,
            foreground: self.foreground.clone(),
            catalog: Arc::clone(&self.catalog),
            schematics_dir: self.schematics_dir.clone(),
        };
        log::info!("[{}] {}", request_id, BuildStage::Dispatched);
        let task = self
            .runtime
            .spawn(pipeline.run(actor, description, request.mode));

        Ok(BuildHandle { request_id, task })
    }

    /// Admission checks; the cooldown slot is taken only when all pass
    fn admit(&self, request: &BuildRequest) -> Result<Arc<dyn GenerationBackend>> {
        if let Some(remaining) = self.cooldowns.remaining(request.actor) {
            return Err(BuildError::cooldown(remaining));
        }
        if request.description.trim().is_empty() {
            return Err(BuildError::EmptyDescription);
        }
        let backend = self
            .backend
            .as_ref()
            .map(Arc::clone)
            .ok_or(BuildError::CredentialMissing)?;
        self.cooldowns
            .try_acquire(request.actor)
            .map_err(BuildError::cooldown)?;
        Ok(backend)
    }

    fn report(&self, actor: ActorId, error: &BuildError) {
        let notice = Notice::error(actor, error.stage(), error.user_message());
        if let Err(e) = self.foreground.submit(move |state| {
            state.notify(notice);
        }) {
            log::warn!("Could not report failure to {}: {}", actor, e);
        }
    }
}

/// Everything the background half of a request needs
struct Pipeline<W> {
    request_id: Uuid,
    config: Arc<GenerationConfig>,
    backend: Arc<dyn GenerationBackend>,
    foreground: ForegroundHandle<W>,
    catalog: Arc<MaterialCatalog>,
    schematics_dir: PathBuf,
}

impl<W: Environment + 'static> Pipeline<W> {
    async fn run(self, actor: ActorId, description: String, mode: BuildMode) -> Result<BuildOutcome> {
        let request_id = self.request_id;
        match self.execute(actor, &description, mode).await {
            Ok(outcome) => {
                log::info!("[{}] {}", request_id, BuildStage::Completed);
                Ok(outcome)
            }
            Err(e) => {
                log::error!("[{}] {} at {}: {}", request_id, BuildStage::Failed, e.stage(), e);
                let notice = Notice::error(actor, e.stage(), e.user_message());
                if let Err(send) = self.foreground.submit(move |state| {
                    state.notify(notice);
                }) {
                    log::warn!("[{}] Could not report failure to {}: {}", request_id, actor, send);
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, actor: ActorId, description: &str, mode: BuildMode) -> Result<BuildOutcome> {
        let prompt = Prompt::new(&self.config, description);
        let text = self.backend.generate_prompt(&prompt).await?;
        log::info!(
            "[{}] {} ({} chars from {})",
            self.request_id,
            BuildStage::Generated,
            text.len(),
            self.backend.name()
        );

        let config = Arc::clone(&self.config);
        let grid = tokio::task::spawn_blocking(move || GridValidator::new(&config).validate(&text))
            .await
            .map_err(|e| BuildError::TaskFailed(e.to_string()))??;
        let (x, y, z) = grid.dimensions();
        log::info!(
            "[{}] {} '{}' {}x{}x{} with {} cells",
            self.request_id,
            BuildStage::Validated,
            grid.name(),
            x,
            y,
            z,
            grid.cell_count()
        );

        self.materialize(actor, grid, mode).await
    }

    async fn materialize(&self, actor: ActorId, grid: CanonicalGrid, mode: BuildMode) -> Result<BuildOutcome> {
        let request_id = self.request_id;
        let catalog = Arc::clone(&self.catalog);
        let dir = self.schematics_dir.clone();

        self.foreground
            .run(move |state| {
                if !state.is_present(actor) {
                    log::info!("[{}] Actor {} left; discarding '{}'", request_id, actor, grid.name());
                    return Ok(BuildOutcome::ActorGone);
                }
                log::debug!("[{}] {}", request_id, BuildStage::Materializing);

                let result = match mode {
                    BuildMode::Place { origin } => {
                        let name = grid.name().to_string();
                        let requested = grid.cell_count();
                        let applied = materialize::apply_direct(grid, origin, state.world_mut(), &catalog);
                        state.notify(Notice::success(actor, format!("Placed {} blocks ({})", applied, name)));
                        MaterializationResult::Placed {
                            name,
                            applied,
                            requested,
                        }
                    }
                    BuildMode::Save => {
                        let saved = materialize::persist(grid, &dir, &catalog)?;
                        state.notify(Notice::success(
                            actor,
                            format!("Saved {} blocks to {}", saved.written, saved.path.display()),
                        ));
                        saved.into()
                    }
                };
                Ok(BuildOutcome::Completed(result))
            })
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use generation::GenerationError;
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use crate::cooldown::ManualClock;
    use crate::environment::InMemoryWorld;
    use crate::error::PersistError;
    use crate::foreground::{ForegroundExecutor, ForegroundState};
    use crate::notice::{NoticeKind, VecNoticeSink};

    const HUT: &str = r#"{"name":"Hut","dimensions":{"x":2,"y":1,"z":1},"blocks":[
        {"x":0,"y":0,"z":0,"block":"minecraft:oak_planks"},
        {"x":1,"y":0,"z":0,"block":"minecraft:glass"}
    ]}"#;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<std::result::Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            _system_instruction: &str,
            _user_text: &str,
        ) -> std::result::Result<String, GenerationError> {
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::MalformedResponse("script exhausted".into())))
        }
    }

    /// Replies once the test opens the gate
    struct GatedBackend {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl GenerationBackend for GatedBackend {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn generate(
            &self,
            _system_instruction: &str,
            _user_text: &str,
        ) -> std::result::Result<String, GenerationError> {
            self.gate.notified().await;
            Ok(HUT.to_string())
        }
    }

    struct Harness {
        coordinator: BuildCoordinator<InMemoryWorld>,
        executor: ForegroundExecutor<InMemoryWorld>,
        notices: VecNoticeSink,
        clock: ManualClock,
        actor: ActorId,
    }

    async fn harness(backend: Option<Arc<dyn GenerationBackend>>) -> Harness {
        let notices = VecNoticeSink::new();
        let executor =
            ForegroundExecutor::start(ForegroundState::new(InMemoryWorld::new(), notices.clone())).unwrap();
        let actor = ActorId::new();
        executor
            .handle()
            .run(move |state| state.actors_mut().join(actor, "Steve"))
            .await
            .unwrap();

        let clock = ManualClock::new();
        let cooldowns = CooldownTracker::with_clock(Duration::from_secs(30), Arc::new(clock.clone()));
        let coordinator = BuildCoordinator::new(
            GenerationConfig::default(),
            backend,
            cooldowns,
            executor.handle(),
            Handle::current(),
        );
        Harness {
            coordinator,
            executor,
            notices,
            clock,
            actor,
        }
    }

    /// Wait until every queued foreground job has run
    async fn settle(h: &Harness) {
        h.executor.handle().run(|_| ()).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_completes() {
        let h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string())]))).await;

        let handle = h
            .coordinator
            .submit(BuildRequest::place(h.actor, "  a small hut ", BlockPos::new(10, 64, 10)))
            .unwrap();
        let outcome = handle.outcome().await.unwrap();
        assert_eq!(
            outcome,
            BuildOutcome::Completed(MaterializationResult::Placed {
                name: "Hut".to_string(),
                applied: 2,
                requested: 2,
            })
        );

        settle(&h).await;
        assert_eq!(
            h.notices.texts_for(h.actor),
            vec!["Generating: a small hut".to_string(), "Placed 2 blocks (Hut)".to_string()]
        );

        let world = h.executor.shutdown().unwrap().into_world();
        assert_eq!(
            world.block_at(BlockPos::new(11, 64, 10)).map(|m| m.as_str()),
            Some("minecraft:glass")
        );
    }

    #[tokio::test]
    async fn test_save_writes_schematic() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string())]))).await;
        h.coordinator = h.coordinator.with_schematics_dir(dir.path());

        let outcome = h
            .coordinator
            .submit(BuildRequest::save(h.actor, "hut"))
            .unwrap()
            .outcome()
            .await
            .unwrap();

        let expected_path = dir.path().join("Hut.schem");
        assert_eq!(
            outcome,
            BuildOutcome::Completed(MaterializationResult::Saved {
                written: 2,
                path: expected_path.clone(),
            })
        );
        assert!(expected_path.exists());

        let world = h.executor.shutdown().unwrap().into_world();
        assert_eq!(world.block_count(), 0);
    }

    #[tokio::test]
    async fn test_cooldown_rejects_second_request() {
        let h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string()), Ok(HUT.to_string())]))).await;

        let first = assert_ok!(h.coordinator.submit(BuildRequest::save(h.actor, "one")));
        h.clock.advance(Duration::from_secs(10));

        let err = assert_err!(h.coordinator.submit(BuildRequest::save(h.actor, "two")));
        assert!(matches!(err, BuildError::Cooldown { remaining_secs: 20 }));
        assert_eq!(err.user_message(), "Cooldown: wait 20s");

        let _ = first.outcome().await;
        h.executor.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_failed_generation_still_consumes_slot() {
        let h = harness(Some(ScriptedBackend::new(vec![Err(GenerationError::Service {
            status: 429,
            body: "quota exceeded".to_string(),
        })])))
        .await;

        let err = h
            .coordinator
            .submit(BuildRequest::place(h.actor, "tower", BlockPos::ORIGIN))
            .unwrap()
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Generation(_)));
        assert!(err.to_string().contains("429"));

        settle(&h).await;
        let failure = h
            .notices
            .notices()
            .into_iter()
            .find(|n| n.is_error())
            .unwrap();
        assert_eq!(failure.kind, NoticeKind::Error { stage: BuildStage::Dispatched });
        assert!(!failure.text.contains("quota"));

        assert!(h.coordinator.cooldowns().remaining(h.actor).is_some());
        assert_err!(h.coordinator.submit(BuildRequest::place(h.actor, "tower", BlockPos::ORIGIN)));
        h.executor.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_unparseable_output_fails_at_validation() {
        let h = harness(Some(ScriptedBackend::new(vec![Ok("I cannot build that".to_string())]))).await;

        let err = h
            .coordinator
            .submit(BuildRequest::place(h.actor, "castle", BlockPos::ORIGIN))
            .unwrap()
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Parse(_)));
        assert_eq!(err.stage(), BuildStage::Validated);

        let world = h.executor.shutdown().unwrap().into_world();
        assert_eq!(world.block_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_description_keeps_slot() {
        let h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string())]))).await;

        let err = assert_err!(h.coordinator.submit(BuildRequest::save(h.actor, "   ")));
        assert!(matches!(err, BuildError::EmptyDescription));
        assert!(h.coordinator.cooldowns().remaining(h.actor).is_none());

        settle(&h).await;
        assert_eq!(
            h.notices.texts_for(h.actor),
            vec!["Provide a building description.".to_string()]
        );
        h.executor.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_missing_credential_refused() {
        let h = harness(None).await;

        let err = assert_err!(h
            .coordinator
            .submit(BuildRequest::place(h.actor, "hut", BlockPos::ORIGIN)));
        assert!(matches!(err, BuildError::CredentialMissing));
        assert!(h.coordinator.cooldowns().remaining(h.actor).is_none());
        h.executor.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_absent_actor_is_noop() {
        let h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string())]))).await;
        let stranger = ActorId::new();

        let outcome = h
            .coordinator
            .submit(BuildRequest::place(stranger, "hut", BlockPos::ORIGIN))
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert_eq!(outcome, BuildOutcome::ActorGone);

        settle(&h).await;
        assert!(h.notices.notices().is_empty());
        let world = h.executor.shutdown().unwrap().into_world();
        assert_eq!(world.block_count(), 0);
    }

    #[tokio::test]
    async fn test_actor_leaving_mid_generation_discards_result() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let h = harness(Some(Arc::new(GatedBackend { gate: Arc::clone(&gate) }))).await;

        let handle = h
            .coordinator
            .submit(BuildRequest::place(h.actor, "hut", BlockPos::ORIGIN))
            .unwrap();

        let actor = h.actor;
        let left = h
            .executor
            .handle()
            .run(move |state| state.actors_mut().leave(actor))
            .await
            .unwrap();
        assert!(left);
        gate.notify_one();

        assert_eq!(handle.outcome().await.unwrap(), BuildOutcome::ActorGone);

        settle(&h).await;
        let notices = h.notices.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].text, "Generating: hut");
        assert!(notices.iter().all(|n| n.kind != NoticeKind::Success));

        let world = h.executor.shutdown().unwrap().into_world();
        assert_eq!(world.block_count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_schematics_dir_fails_at_materializing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut h = harness(Some(ScriptedBackend::new(vec![Ok(HUT.to_string())]))).await;
        h.coordinator = h.coordinator.with_schematics_dir(&blocker);

        let err = h
            .coordinator
            .submit(BuildRequest::save(h.actor, "hut"))
            .unwrap()
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Persist(PersistError::Io { .. })));

        settle(&h).await;
        let failure = h
            .notices
            .notices()
            .into_iter()
            .find(|n| n.is_error())
            .unwrap();
        assert_eq!(failure.kind, NoticeKind::Error { stage: BuildStage::Materializing });
        assert_eq!(failure.text, "Failed to save schematic.");

        assert!(h.coordinator.cooldowns().remaining(h.actor).is_some());
        h.executor.shutdown().unwrap();
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(BuildStage::RateChecked.to_string(), "rate_checked");
        assert_eq!(BuildStage::Completed.to_string(), "completed");
    }
}
