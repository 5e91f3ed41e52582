//! Actors that request builds

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies whoever issued a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Actors currently present in the environment.
///
/// Owned by the foreground executor; background work never reads it.
#[derive(Debug, Default)]
pub struct ActorDirectory {
    present: HashMap<ActorId, String>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an actor present under a display name
    pub fn join(&mut self, actor: ActorId, name: impl Into<String>) {
        self.present.insert(actor, name.into());
    }

    /// Remove an actor; returns whether they were present
    pub fn leave(&mut self, actor: ActorId) -> bool {
        self.present.remove(&actor).is_some()
    }

    pub fn is_present(&self, actor: ActorId) -> bool {
        self.present.contains_key(&actor)
    }

    pub fn name(&self, actor: ActorId) -> Option<&str> {
        self.present.get(&actor).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_leave() {
        let mut actors = ActorDirectory::new();
        let steve = ActorId::new();

        assert!(!actors.is_present(steve));
        actors.join(steve, "Steve");
        assert!(actors.is_present(steve));
        assert_eq!(actors.name(steve), Some("Steve"));

        assert!(actors.leave(steve));
        assert!(!actors.leave(steve));
        assert!(actors.is_empty());
    }
}
