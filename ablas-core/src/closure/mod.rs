//! Closures and Ownership Transfer
//!
//! A closure keeps a value alive until every task that references it has
//! finished, without the caller waiting for those tasks.
//!
//! # How It Works
//!
//! 1. The value is moved into an `Arc` and registered in the scheduler's
//!    closure arena under a fresh [`ClosureId`].
//! 2. The producer callback runs synchronously with the relocated value and
//!    spawns whatever tasks need it.
//! 3. A release sentinel is spawned as a *writer* of the value's dependency
//!    node. A write waits for every claim on the node, so the sentinel runs
//!    only after all tasks from step 2 (and any earlier ones) completed. Its
//!    body removes the arena entry, dropping the value.
//!
//! If the producer spawns nothing the sentinel has no predecessors and the
//! value is released right away. Sentinels run even when their node is
//! poisoned.

mod arena;

use std::sync::Arc;

use crate::graph::{DependencyNode, SchedulerHandle, WorkKind};

pub use arena::ClosureId;
pub(crate) use arena::ClosureArena;

/// A value that carries the dependency node of the variable it represents.
pub trait Tracked {
    /// The node tasks touching this value are declared against.
    fn dependencies(&self) -> &DependencyNode;
}

impl Tracked for DependencyNode {
    fn dependencies(&self) -> &DependencyNode {
        self
    }
}

impl<T: Tracked + ?Sized> Tracked for Arc<T> {
    fn dependencies(&self) -> &DependencyNode {
        (**self).dependencies()
    }
}

impl SchedulerHandle {
    /// Take ownership of `temporary` until every task `producer` spawns
    /// against it has completed.
    pub fn create_closure<T, F>(&self, temporary: T, producer: F) -> ClosureId
    where
        T: Tracked + Send + Sync + 'static,
        F: FnOnce(&Arc<T>),
    {
        let value = Arc::new(temporary);
        let id = self.shared.closures.insert(Box::new(Arc::clone(&value)));
        producer(&value);
        self.spawn_release(id, value.dependencies(), &[]);
        id
    }

    /// Two-temporary form of [`create_closure`](Self::create_closure).
    ///
    /// The sentinel writes the first value's node and reads the second's.
    pub fn create_closure2<T1, T2, F>(&self, first: T1, second: T2, producer: F) -> ClosureId
    where
        T1: Tracked + Send + Sync + 'static,
        T2: Tracked + Send + Sync + 'static,
        F: FnOnce(&Arc<T1>, &Arc<T2>),
    {
        let first = Arc::new(first);
        let second = Arc::new(second);
        let id = self
            .shared
            .closures
            .insert(Box::new((Arc::clone(&first), Arc::clone(&second))));
        producer(&first, &second);
        self.spawn_release(id, first.dependencies(), &[second.dependencies()]);
        id
    }

    /// Keep `value` alive until the tasks already pending on it complete.
    pub fn make_closure_variable<T>(&self, value: T) -> ClosureId
    where
        T: Tracked + Send + Sync + 'static,
    {
        self.create_closure(value, |_| {})
    }

    /// Number of closure values not yet released.
    pub fn live_closures(&self) -> usize {
        self.shared.closures.len()
    }

    /// Whether the value registered under `id` is still owned by the arena.
    pub fn is_closure_live(&self, id: ClosureId) -> bool {
        self.shared.closures.contains(id)
    }

    fn spawn_release(&self, id: ClosureId, write: &DependencyNode, reads: &[&DependencyNode]) {
        let arena = self.shared.closures.clone();
        self.shared.admit(
            Box::new(move || {
                arena.release(id);
            }),
            WorkKind::Release,
            write,
            reads,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::PoolConfig;
    use crate::graph::Scheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    /// Records how many tasks had finished when it was dropped.
    struct Probe {
        node: DependencyNode,
        finished: Arc<AtomicUsize>,
        seen_at_drop: Arc<AtomicUsize>,
    }

    impl Tracked for Probe {
        fn dependencies(&self) -> &DependencyNode {
            &self.node
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.seen_at_drop
                .store(self.finished.load(Ordering::SeqCst), Ordering::SeqCst);
        }
    }

    fn release_after(tasks: usize) {
        let scheduler = Scheduler::new(PoolConfig::with_workers(4)).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        let seen_at_drop = Arc::new(AtomicUsize::new(usize::MAX));
        let probe = Probe {
            node: DependencyNode::new(),
            finished: Arc::clone(&finished),
            seen_at_drop: Arc::clone(&seen_at_drop),
        };

        let id = scheduler.create_closure(probe, |probe| {
            for i in 0..tasks {
                let finished = Arc::clone(&finished);
                let body = move || {
                    std::thread::sleep(Duration::from_millis(1));
                    finished.fetch_add(1, Ordering::SeqCst);
                };
                // Mix readers and writers of the temporary.
                if i % 3 == 0 {
                    scheduler.spawn(body, probe.dependencies(), &[]);
                } else {
                    scheduler.spawn(body, &DependencyNode::new(), &[probe.dependencies()]);
                }
            }
        });

        scheduler.wait();
        assert!(!scheduler.is_closure_live(id));
        assert_eq!(scheduler.live_closures(), 0);
        assert_eq!(seen_at_drop.load(Ordering::SeqCst), tasks);
    }

    #[test]
    fn release_with_no_tasks() {
        release_after(0);
    }

    #[test]
    fn release_after_single_task() {
        release_after(1);
    }

    #[test]
    fn release_after_many_tasks() {
        release_after(40);
    }

    #[test]
    fn closure_variable_stays_claimed_until_tasks_finish() {
        let scheduler = Scheduler::new(PoolConfig::with_workers(2)).unwrap();
        let node = DependencyNode::new();
        let (gate, rx) = mpsc::channel::<()>();

        scheduler.spawn(move || rx.recv().unwrap(), &DependencyNode::new(), &[&node]);

        let handle = node.clone();
        let id = scheduler.make_closure_variable(node);
        assert!(!handle.is_idle());
        assert!(scheduler.is_closure_live(id));

        gate.send(()).unwrap();
        scheduler.wait();
        assert!(handle.is_idle());
        assert!(!scheduler.is_closure_live(id));
    }

    #[test]
    fn two_temporaries_released_together() {
        let scheduler = Scheduler::new(PoolConfig::with_workers(2)).unwrap();
        let a = Arc::new(AtomicUsize::new(0));
        let a_clone = Arc::clone(&a);

        let id = scheduler.create_closure2(
            DependencyNode::new(),
            DependencyNode::new(),
            |first, second| {
                scheduler.spawn(
                    move || {
                        a_clone.fetch_add(1, Ordering::SeqCst);
                    },
                    first.dependencies(),
                    &[second.dependencies()],
                );
            },
        );
        scheduler.wait();
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_closure_live(id));
    }

    #[test]
    fn poisoned_closure_is_still_released() {
        let scheduler = Scheduler::new(PoolConfig::with_workers(1)).unwrap();
        let node = DependencyNode::new();
        let handle = node.clone();
        let id = scheduler.create_closure(node, |node| {
            scheduler.spawn(|| panic!("bad kernel"), node.dependencies(), &[]);
        });
        scheduler.wait();
        assert!(handle.is_poisoned());
        assert!(!scheduler.is_closure_live(id));
    }
}
