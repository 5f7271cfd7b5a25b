//! Dependency Graph
//!
//! This module implements the asynchronous dependency scheduler: the
//! bookkeeping that turns a stream of `spawn` calls into a graph of work items
//! and runs them on a worker pool without ever letting a writer overlap
//! another task on the same variable.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Dependency nodes stand for mutable variables (vectors, matrices,
//!   temporaries). Each records the in-flight work items claiming it.
//! - Work items stand for admitted tasks. Each records the nodes it touches,
//!   its successors and how many predecessors are still running.
//!
//! # Ordering
//!
//! For two tasks enqueued in program order on the same variable where at least
//! one writes, the second waits for the first. Two reads with no intervening
//! write may run concurrently. Tasks on unrelated variables never wait on each
//! other.

mod node;
mod scheduler;
mod work;

pub use node::{AccessMode, DependencyNode, NodeId};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats, TaskFailure};
pub use work::{Job, WorkId};

pub(crate) use work::WorkKind;
