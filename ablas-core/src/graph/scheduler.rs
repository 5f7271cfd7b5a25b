//! Dependency Scheduler
//!
//! The scheduler turns `spawn` calls into a graph of work items and hands
//! each item to the execution pool once everything it depends on finished.
//!
//! # Algorithm
//!
//! Admission of a task writing `W` and reading `R1..Rn`:
//!
//! 1. Lock the graph.
//! 2. Predecessors = every current claim on `W`, plus the pending writer of
//!    each `Ri`, if any. Readers never wait on readers.
//! 3. Link the new item as a successor of each predecessor and record the
//!    predecessor count.
//! 4. Declare the reads, then the write. The write is recorded last so that it
//!    wins when `W` is also one of the `Ri`.
//! 5. Unlock, and dispatch the item if it has no predecessors.
//!
//! Completion, on the worker that ran the body:
//!
//! 1. Lock the graph.
//! 2. Decrement each successor's count and collect those reaching zero.
//! 3. Release the finished item's claims and remove it from the live list.
//! 4. Unlock, and dispatch the collected successors.
//!
//! Bodies always run outside the graph lock. Because every predecessor was
//! admitted strictly before its successor, the graph is acyclic by
//! construction.
//!
//! # Failures
//!
//! Bodies run under `catch_unwind`. A panicking body poisons the node it
//! writes; a task whose inputs are poisoned is skipped and poisons its own
//! write node in turn. Bookkeeping runs either way, so the graph always
//! drains.

use std::fmt;
use std::ops::Deref;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use super::node::{DependencyNode, NodeId};
use super::work::{panic_message, Job, Outcome, WorkId, WorkItem, WorkKind};
use crate::closure::ClosureArena;
use crate::error::Result;
use crate::exec::{ExecutionPool, PoolConfig};

/// A task body that panicked, as recorded by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    /// The failed work item.
    pub work: WorkId,
    /// The node it was writing, now poisoned.
    pub node: NodeId,
    /// The panic message.
    pub message: String,
}

/// Snapshot of the scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Total work items admitted.
    pub spawned: u64,
    /// Work items whose body ran to completion.
    pub completed: u64,
    /// Work items whose body panicked.
    pub failed: u64,
    /// Work items dropped because an input was poisoned.
    pub skipped: u64,
    /// Work items currently in the graph.
    pub live: usize,
}

#[derive(Default)]
struct Counters {
    spawned: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Default)]
struct Graph {
    items: IndexMap<WorkId, WorkItem>,
}

/// A ready item taken out of the graph for submission.
struct Dispatch {
    id: WorkId,
    /// `None` when the item is skipped.
    body: Option<Job>,
}

impl Graph {
    fn take_ready(&mut self, id: WorkId) -> Option<Dispatch> {
        let item = self.items.get_mut(&id)?;
        debug_assert_eq!(item.pending, 0, "dispatching {id} with pending predecessors");
        let body = item.body.take()?;
        if item.inputs_poisoned() {
            warn!(work = %id, "skipping task with poisoned input");
            return Some(Dispatch { id, body: None });
        }
        Some(Dispatch {
            id,
            body: Some(body),
        })
    }
}

pub(crate) struct Shared {
    graph: Mutex<Graph>,
    drained: Condvar,
    pool: ExecutionPool,
    pub(crate) closures: ClosureArena,
    counters: Counters,
    failures: Mutex<Vec<TaskFailure>>,
}

impl Shared {
    pub(crate) fn admit(
        self: &Arc<Self>,
        body: Job,
        kind: WorkKind,
        write: &DependencyNode,
        reads: &[&DependencyNode],
    ) -> WorkId {
        let id = WorkId::new();
        let dispatch = {
            let mut graph = self.graph.lock();

            let mut predecessors = Vec::new();
            write.collect_write_predecessors(&mut predecessors);
            for node in reads {
                node.collect_read_predecessors(&mut predecessors);
            }
            predecessors.sort_unstable();
            predecessors.dedup();

            let mut pending = 0;
            for pred in &predecessors {
                match graph.items.get_mut(pred) {
                    Some(item) => {
                        item.successors.push(id);
                        pending += 1;
                    }
                    None => {
                        warn!(work = %id, predecessor = %pred, "claim held by unknown work item")
                    }
                }
            }

            let mut nodes: SmallVec<[DependencyNode; 4]> =
                reads.iter().map(|&node| node.clone()).collect();
            nodes.push(write.clone());

            for node in reads {
                node.declare_read(id);
            }
            write.declare_write(id);

            graph.items.insert(
                id,
                WorkItem {
                    body: Some(body),
                    kind,
                    nodes,
                    successors: SmallVec::new(),
                    pending,
                },
            );
            self.counters.spawned.fetch_add(1, Ordering::Relaxed);
            trace!(work = %id, predecessors = pending, writes = %write.id(), "task admitted");

            if pending == 0 {
                graph.take_ready(id)
            } else {
                None
            }
        };

        if let Some(dispatch) = dispatch {
            self.submit(dispatch);
        }
        id
    }

    fn submit(self: &Arc<Self>, dispatch: Dispatch) {
        let shared = Arc::clone(self);
        let Dispatch { id, body } = dispatch;
        trace!(work = %id, "task dispatched");
        self.pool.execute(Box::new(move || {
            let outcome = match body {
                None => Outcome::Skipped,
                Some(body) => match catch_unwind(AssertUnwindSafe(body)) {
                    Ok(()) => Outcome::Completed,
                    Err(payload) => Outcome::Failed(panic_message(payload.as_ref())),
                },
            };
            shared.on_complete(id, outcome);
        }));
    }

    fn on_complete(self: &Arc<Self>, id: WorkId, outcome: Outcome) {
        let mut ready: SmallVec<[Dispatch; 4]> = SmallVec::new();
        {
            let mut graph = self.graph.lock();
            let Some(item) = graph.items.swap_remove(&id) else {
                error!(work = %id, "completion for unknown work item");
                return;
            };

            match outcome {
                Outcome::Completed => {
                    self.counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                Outcome::Skipped => {
                    self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                    item.write_node().poison();
                }
                Outcome::Failed(message) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    let node = item.write_node();
                    node.poison();
                    error!(work = %id, node = %node.id(), %message, "task body panicked");
                    self.failures.lock().push(TaskFailure {
                        work: id,
                        node: node.id(),
                        message,
                    });
                }
            }

            for succ in &item.successors {
                let Some(next) = graph.items.get_mut(succ) else {
                    continue;
                };
                next.pending -= 1;
                if next.pending == 0 {
                    ready.extend(graph.take_ready(*succ));
                }
            }

            for node in &item.nodes {
                node.release_claim(id);
            }

            if graph.items.is_empty() {
                self.drained.notify_all();
            }
        }

        for dispatch in ready {
            self.submit(dispatch);
        }
    }
}

/// Owning handle to a dependency-tracked task scheduler.
///
/// Each instance owns its own graph, execution pool and closure arena. Most
/// code uses the process-wide instance from [`crate::runtime::scheduler`];
/// tests and embedders can construct isolated ones.
///
/// All operations live on [`SchedulerHandle`], which this type dereferences
/// to. Dropping a `Scheduler` blocks until its graph has drained; dropping a
/// handle does not.
pub struct Scheduler {
    handle: SchedulerHandle,
}

impl Scheduler {
    /// Create a scheduler with its own worker pool.
    pub fn new(config: PoolConfig) -> Result<Self> {
        let pool = ExecutionPool::new(&config)?;
        debug!(workers = pool.num_workers(), "scheduler created");
        Ok(Self {
            handle: SchedulerHandle {
                shared: Arc::new(Shared {
                    graph: Mutex::new(Graph::default()),
                    drained: Condvar::new(),
                    pool,
                    closures: ClosureArena::new(),
                    counters: Counters::default(),
                    failures: Mutex::new(Vec::new()),
                }),
            },
        })
    }

    /// A cheap, clonable handle to this scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }
}

impl Deref for Scheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.handle.wait();
        debug!("scheduler drained");
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.handle.fmt(f)
    }
}

/// Shared handle used to spawn work on a scheduler.
///
/// Containers keep one so their operations and deferred destruction go to
/// the scheduler they were created on.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Admit a task writing `write` and reading `reads`. Returns immediately.
    ///
    /// `write` may also appear in `reads`. A task with nothing to read, such
    /// as filling a fresh container, passes an empty slice.
    pub fn spawn<F>(&self, body: F, write: &DependencyNode, reads: &[&DependencyNode]) -> WorkId
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.admit(Box::new(body), WorkKind::Compute, write, reads)
    }

    /// Block until the live work-item list is empty.
    ///
    /// Must not be called from inside a task body.
    pub fn wait(&self) {
        debug_assert!(
            !self.shared.pool.is_worker_thread(),
            "SchedulerHandle::wait called from a task body"
        );
        let mut graph = self.shared.graph.lock();
        while !graph.items.is_empty() {
            self.shared.drained.wait(&mut graph);
        }
    }

    /// Number of work items admitted but not yet completed.
    pub fn live_work_items(&self) -> usize {
        self.shared.graph.lock().items.len()
    }

    /// Unresolved predecessor count of a live work item.
    pub fn pending_predecessors(&self, work: WorkId) -> Option<usize> {
        self.shared
            .graph
            .lock()
            .items
            .get(&work)
            .map(|item| item.pending)
    }

    /// Whether `work` has been admitted and not yet completed.
    pub fn is_live(&self, work: WorkId) -> bool {
        self.shared.graph.lock().items.contains_key(&work)
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.shared.pool.num_workers()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            spawned: counters.spawned.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            live: self.live_work_items(),
        }
    }

    /// Drain the recorded task failures.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut *self.shared.failures.lock())
    }

    /// Whether both handles refer to the same scheduler.
    pub fn same_scheduler(&self, other: &SchedulerHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pool", &self.shared.pool)
            .field("live_work_items", &self.live_work_items())
            .field("live_closures", &self.shared.closures.len())
            .finish()
    }
}
