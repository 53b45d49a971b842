//! Short-TTL read cache with write-triggered invalidation.
//!
//! The cache is an explicitly constructed object owned by the store, not
//! ambient state: the clock is injectable so tests fast-forward time
//! instead of sleeping. Invalidation is coarse — any write to a tab
//! evicts every cached query for that tab. The cache is per-process;
//! another process writing the same backing document is only observed
//! once the TTL lapses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::record::Record;
use crate::schema::Tab;

/// Reference TTL for repository reads.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic expiry tests.
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + *offset
    }
}

/// Per-query cache in front of list/get reads.
pub struct ReadCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<(Tab, String), (Vec<Record>, Instant)>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        ReadCache {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for (tab, signature) if inserted less than TTL ago.
    pub fn get(&self, tab: Tab, signature: &str) -> Option<Vec<Record>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&(tab, signature.to_string())) {
            Some((value, inserted_at)) if now.duration_since(*inserted_at) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(&(tab, signature.to_string()));
                None
            }
            None => None,
        }
    }

    pub fn put(&self, tab: Tab, signature: &str, value: Vec<Record>) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((tab, signature.to_string()), (value, now));
    }

    /// Evict every cached query for a tab. Called by every mutating
    /// repository operation on that tab.
    pub fn invalidate_tab(&self, tab: Tab) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(entry_tab, _), _| *entry_tab != tab);
    }
}
