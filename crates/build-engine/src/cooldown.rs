//! Per-actor request rate limiting

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::actor::ActorId;

/// Source of monotonic time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Last accepted request time per actor.
///
/// Entries are never evicted; one timestamp per actor that ever asked.
pub struct CooldownTracker {
    window: Duration,
    clock: Arc<dyn Clock>,
    last_accepted: Mutex<HashMap<ActorId, Instant>>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Time left before `actor` may ask again; `None` when allowed now
    pub fn remaining(&self, actor: ActorId) -> Option<Duration> {
        let now = self.clock.now();
        let map = self.last_accepted.lock();
        map.get(&actor).and_then(|last| self.left(*last, now))
    }

    /// Check and record in one step.
    ///
    /// On success the request time is stored immediately, so a request
    /// that later fails still uses the actor's slot.
    pub fn try_acquire(&self, actor: ActorId) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut map = self.last_accepted.lock();
        if let Some(left) = map.get(&actor).and_then(|last| self.left(*last, now)) {
            return Err(left);
        }
        map.insert(actor, now);
        Ok(())
    }

    fn left(&self, last: Instant, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.window).then(|| self.window - elapsed)
    }
}
