//! The single foreground execution context
//!
//! The environment, the actor directory and notice delivery live on one
//! dedicated OS thread. Everything else talks to them by posting jobs to
//! its queue; jobs run one at a time in submission order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};

use crate::actor::{ActorDirectory, ActorId};
use crate::environment::Environment;
use crate::error::{BuildError, Result};
use crate::notice::{Notice, NoticeSink};

type Job<W> = Box<dyn FnOnce(&mut ForegroundState<W>) + Send>;

enum Message<W> {
    Job(Job<W>),
    Shutdown,
}

/// State owned by the foreground thread
pub struct ForegroundState<W> {
    world: W,
    actors: ActorDirectory,
    notices: Box<dyn NoticeSink>,
}

impl<W: Environment> ForegroundState<W> {
    pub fn new(world: W, notices: impl NoticeSink + 'static) -> Self {
        Self {
            world,
            actors: ActorDirectory::new(),
            notices: Box::new(notices),
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn actors_mut(&mut self) -> &mut ActorDirectory {
        &mut self.actors
    }

    pub fn is_present(&self, actor: ActorId) -> bool {
        self.actors.is_present(actor)
    }

    /// Deliver a notice if its actor is still present.
    ///
    /// Returns whether the notice was handed to the sink.
    pub fn notify(&mut self, notice: Notice) -> bool {
        if !self.actors.is_present(notice.actor) {
            log::debug!("Dropping notice for absent actor {}", notice.actor);
            return false;
        }
        if let Err(e) = self.notices.send(notice) {
            log::warn!("Failed to deliver notice: {}", e);
            return false;
        }
        true
    }

    pub fn into_world(self) -> W {
        self.world
    }
}

/// Owns the foreground thread
pub struct ForegroundExecutor<W> {
    handle: ForegroundHandle<W>,
    thread: Option<JoinHandle<ForegroundState<W>>>,
}

impl<W: Environment + 'static> ForegroundExecutor<W> {
    /// Spawn the foreground thread with its initial state
    pub fn start(state: ForegroundState<W>) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message<W>>();

        let thread = std::thread::Builder::new()
            .name("foreground".to_string())
            .spawn(move || {
                let mut state = state;
                while let Some(message) = rx.blocking_recv() {
                    match message {
                        Message::Job(job) => {
                            if catch_unwind(AssertUnwindSafe(|| job(&mut state))).is_err() {
                                log::error!("Foreground job panicked; continuing");
                            }
                        }
                        Message::Shutdown => break,
                    }
                }
                log::debug!("Foreground executor stopped");
                state
            })?;

        Ok(Self {
            handle: ForegroundHandle { tx },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> ForegroundHandle<W> {
        self.handle.clone()
    }

    /// Stop after the jobs already queued and hand back the state
    pub fn shutdown(mut self) -> Result<ForegroundState<W>> {
        let _ = self.handle.tx.send(Message::Shutdown);
        let thread = self.thread.take().ok_or(BuildError::ForegroundClosed)?;
        thread
            .join()
            .map_err(|_| BuildError::TaskFailed("foreground thread panicked".to_string()))
    }
}

impl<W> Drop for ForegroundExecutor<W> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.handle.tx.send(Message::Shutdown);
        }
    }
}

/// Cloneable sender of foreground jobs
pub struct ForegroundHandle<W> {
    tx: mpsc::UnboundedSender<Message<W>>,
}

impl<W> Clone for ForegroundHandle<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<W: Environment + 'static> ForegroundHandle<W> {
    /// Queue a job without waiting for it
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&mut ForegroundState<W>) + Send + 'static,
    {
        self.tx
            .send(Message::Job(Box::new(job)))
            .map_err(|_| BuildError::ForegroundClosed)
    }

    /// Queue a job and wait for its result
    pub async fn run<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&mut ForegroundState<W>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(move |state| {
            let _ = tx.send(job(state));
        })?;
        rx.await.map_err(|_| BuildError::ForegroundClosed)
    }
}
