//! Dependency Nodes
//!
//! A dependency node is the per-variable synchronization record. Every
//! container that tasks read or write carries one, and the scheduler records
//! on it which in-flight work items currently claim the variable.
//!
//! # Claim Protocol
//!
//! - A write claim replaces every existing claim. The writer is linked after
//!   all of them, so future tasks only need to wait for the writer.
//! - A read claim is appended to the readers of the pending writer. The
//!   writer stays recorded until it completes, so every later reader still
//!   waits for it while readers never wait for each other.
//! - A writer waits for the pending writer and all readers after it.
//! - Completion removes the finished item's claim.
//!
//! Claims are only mutated while the owning scheduler holds its graph lock.
//! The atomic claim count mirrors the number of claims so [`DependencyNode::is_idle`]
//! can be polled from any thread without touching that lock. The value is an
//! advisory snapshot: another thread may admit a task right after it is read.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use smallvec::SmallVec;

use super::work::WorkId;
use crate::error::{Result, SchedulerError};

/// Unique identifier for a dependency node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// How the variable is currently claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// No pending task touches the variable.
    Idle,
    /// One or more pending readers, possibly behind a pending writer.
    Shared,
    /// Exactly one pending writer and no readers after it.
    Exclusive,
}

#[derive(Debug, Default)]
struct Claims {
    writer: Option<WorkId>,
    readers: SmallVec<[WorkId; 4]>,
}

impl Claims {
    fn len(&self) -> usize {
        usize::from(self.writer.is_some()) + self.readers.len()
    }

    fn is_empty(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

struct NodeState {
    id: NodeId,
    claims: Mutex<Claims>,
    claim_count: AtomicUsize,
    idle: Condvar,
    poisoned: AtomicBool,
}

/// Handle to the dependency record of one logical variable.
///
/// Cloning the handle shares the record. Containers embed one and hand
/// references to the scheduler whenever they spawn work.
#[derive(Clone)]
pub struct DependencyNode {
    state: Arc<NodeState>,
}

impl DependencyNode {
    /// Create a fresh, idle node.
    pub fn new() -> Self {
        Self {
            state: Arc::new(NodeState {
                id: NodeId::new(),
                claims: Mutex::new(Claims::default()),
                claim_count: AtomicUsize::new(0),
                idle: Condvar::new(),
                poisoned: AtomicBool::new(false),
            }),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    /// True iff no claim is outstanding.
    pub fn is_idle(&self) -> bool {
        self.state.claim_count.load(Ordering::Acquire) == 0
    }

    /// Alias of [`is_idle`](Self::is_idle), named after the container API.
    pub fn is_ready(&self) -> bool {
        self.is_idle()
    }

    /// Number of outstanding claims.
    pub fn claim_count(&self) -> usize {
        self.state.claim_count.load(Ordering::Acquire)
    }

    /// Current access mode.
    pub fn access_mode(&self) -> AccessMode {
        let claims = self.state.claims.lock();
        if !claims.readers.is_empty() {
            AccessMode::Shared
        } else if claims.writer.is_some() {
            AccessMode::Exclusive
        } else {
            AccessMode::Idle
        }
    }

    /// Block the calling thread until every claim has been released.
    ///
    /// Tasks admitted concurrently by other threads may claim the node again
    /// right after this returns.
    pub fn block_until_idle(&self) {
        let mut claims = self.state.claims.lock();
        while !claims.is_empty() {
            self.state.idle.wait(&mut claims);
        }
    }

    /// Block until idle, then report whether the last writer succeeded.
    pub fn wait(&self) -> Result<()> {
        self.block_until_idle();
        if self.is_poisoned() {
            return Err(SchedulerError::Poisoned { node: self.id() });
        }
        Ok(())
    }

    /// Whether a failed or skipped task last wrote this variable.
    pub fn is_poisoned(&self) -> bool {
        self.state.poisoned.load(Ordering::Acquire)
    }

    /// Clear the poison flag so new tasks on this variable run again.
    pub fn clear_poison(&self) {
        self.state.poisoned.store(false, Ordering::Release);
    }

    /// Whether both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn poison(&self) {
        self.state.poisoned.store(true, Ordering::Release);
    }

    /// Record `work` as the only pending claim.
    pub(crate) fn declare_write(&self, work: WorkId) {
        let mut claims = self.state.claims.lock();
        claims.readers.clear();
        claims.writer = Some(work);
        self.state.claim_count.store(1, Ordering::Release);
    }

    /// Add `work` as a reader of the current value.
    pub(crate) fn declare_read(&self, work: WorkId) {
        let mut claims = self.state.claims.lock();
        claims.readers.push(work);
        self.state.claim_count.store(claims.len(), Ordering::Release);
    }

    /// Remove the claim held by `work`, if it is still recorded.
    pub(crate) fn release_claim(&self, work: WorkId) {
        let mut claims = self.state.claims.lock();
        if claims.writer == Some(work) {
            claims.writer = None;
        } else if let Some(pos) = claims.readers.iter().position(|&w| w == work) {
            claims.readers.remove(pos);
        }
        self.state.claim_count.store(claims.len(), Ordering::Release);
        if claims.is_empty() {
            self.state.idle.notify_all();
        }
    }

    /// Append every task a writer of this node must wait for.
    pub(crate) fn collect_write_predecessors(&self, out: &mut Vec<WorkId>) {
        let claims = self.state.claims.lock();
        out.extend(claims.writer);
        out.extend(claims.readers.iter().copied());
    }

    /// Append the pending writer, if any. Readers only wait for that one.
    pub(crate) fn collect_read_predecessors(&self, out: &mut Vec<WorkId>) {
        out.extend(self.state.claims.lock().writer);
    }
}

impl Default for DependencyNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DependencyNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DependencyNode {}

impl fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyNode")
            .field("id", &self.id())
            .field("claims", &self.claim_count())
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}
