//! Closure Arena
//!
//! Owns values handed to the scheduler until their release sentinel runs.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

/// Stable identifier of a value owned by the closure arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosureId(u64);

impl ClosureId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClosureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "closure#{}", self.0)
    }
}

pub(crate) type Owned = Box<dyn Any + Send + Sync>;

/// Concurrent map from closure IDs to the values they keep alive.
#[derive(Clone, Default)]
pub(crate) struct ClosureArena {
    entries: Arc<DashMap<ClosureId, Owned>>,
}

impl ClosureArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, value: Owned) -> ClosureId {
        let id = ClosureId::new();
        self.entries.insert(id, value);
        id
    }

    /// Drop the value owned under `id`. Returns false if it was already gone.
    pub(crate) fn release(&self, id: ClosureId) -> bool {
        // The shard lock is released before the value's destructor runs.
        let Some((_, value)) = self.entries.remove(&id) else {
            return false;
        };
        drop(value);
        debug!(closure = %id, "closure released");
        true
    }

    pub(crate) fn contains(&self, id: ClosureId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
