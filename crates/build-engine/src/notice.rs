//! Notices delivered to actors
//!
//! The host decides how a notice reaches a person (chat line, terminal,
//! nothing at all). Notices are only ever sent from the foreground thread.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::coordinator::BuildStage;

/// Trait for delivering notices to actors
pub trait NoticeSink: Send {
    /// Deliver a notice; errors are logged by the caller and otherwise ignored
    fn send(&mut self, notice: Notice) -> Result<(), NoticeError>;
}

/// Error when delivering a notice fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Notice error: {message}")]
pub struct NoticeError {
    pub message: String,
}

impl NoticeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    /// Failure, tagged with the stage that was being attempted
    Error { stage: BuildStage },
}

/// One message to one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub actor: ActorId,
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(actor: ActorId, text: impl Into<String>) -> Self {
        Self {
            actor,
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn success(actor: ActorId, text: impl Into<String>) -> Self {
        Self {
            actor,
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(actor: ActorId, stage: BuildStage, text: impl Into<String>) -> Self {
        Self {
            actor,
            kind: NoticeKind::Error { stage },
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NoticeKind::Error { .. })
    }
}

/// Discards every notice
pub struct NullNoticeSink;

impl NoticeSink for NullNoticeSink {
    fn send(&mut self, _notice: Notice) -> Result<(), NoticeError> {
        Ok(())
    }
}

/// Collects notices in a shared list.
///
/// Clones share the same list, so a test can keep one clone and hand the
/// other to the foreground executor.
#[derive(Clone, Default)]
pub struct VecNoticeSink {
    notices: std::sync::Arc<parking_lot::Mutex<Vec<Notice>>>,
}

impl VecNoticeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices collected so far
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Texts sent to one actor, in order
    pub fn texts_for(&self, actor: ActorId) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.actor == actor)
            .map(|n| n.text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl NoticeSink for VecNoticeSink {
    fn send(&mut self, notice: Notice) -> Result<(), NoticeError> {
        self.notices.lock().push(notice);
        Ok(())
    }
}

/// Writes notices through the `log` facade
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn send(&mut self, notice: Notice) -> Result<(), NoticeError> {
        match notice.kind {
            NoticeKind::Error { stage } => {
                log::warn!("[{}] ({}) {}", notice.actor, stage, notice.text)
            }
            _ => log::info!("[{}] {}", notice.actor, notice.text),
        }
        Ok(())
    }
}
