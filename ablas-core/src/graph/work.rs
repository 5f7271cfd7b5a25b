//! Work Items
//!
//! One admitted unit of computation plus the bookkeeping the scheduler needs
//! to release it and its successors.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use smallvec::SmallVec;

use super::node::DependencyNode;

/// A task body. It runs exactly once on a pool worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Unique identifier for an admitted work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkId(u64);

impl WorkId {
    /// Generate a new unique work ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

/// What the scheduler does with a body whose inputs are poisoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkKind {
    /// Ordinary kernel: skipped when an input is poisoned.
    Compute,
    /// Closure release sentinel: always runs.
    Release,
}

/// How a dispatched item finished.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    Skipped,
    Failed(String),
}

pub(crate) struct WorkItem {
    pub(crate) body: Option<Job>,
    pub(crate) kind: WorkKind,
    /// Read nodes followed by the write node.
    pub(crate) nodes: SmallVec<[DependencyNode; 4]>,
    pub(crate) successors: SmallVec<[WorkId; 4]>,
    pub(crate) pending: usize,
}

impl WorkItem {
    pub(crate) fn write_node(&self) -> &DependencyNode {
        self.nodes
            .last()
            .unwrap_or_else(|| unreachable!("work item without write node"))
    }

    /// Whether the body must be dropped instead of run.
    pub(crate) fn inputs_poisoned(&self) -> bool {
        self.kind == WorkKind::Compute && self.nodes.iter().any(DependencyNode::is_poisoned)
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("kind", &self.kind)
            .field("nodes", &self.nodes.len())
            .field("successors", &self.successors)
            .field("pending", &self.pending)
            .field("dispatched", &self.body.is_none())
            .finish()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
