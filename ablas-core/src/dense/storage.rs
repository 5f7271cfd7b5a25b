//! Shared Dense Storage
//!
//! Every container owns an `Arc<DenseState>`: the elements, their shape and
//! the dependency node tracking them. Task bodies capture a [`DenseClosure`]
//! sharing the same state, so the storage stays alive for as long as any
//! task needs it. The lock around the elements is never contended in
//! practice: the scheduler already guarantees a writer runs alone.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::closure::Tracked;
use crate::error::{Result, SchedulerError};
use crate::graph::{DependencyNode, SchedulerHandle, WorkId};
use crate::kernels::{self, Element};

pub(crate) struct DenseState<T> {
    rows: usize,
    cols: usize,
    data: RwLock<Vec<T>>,
    node: DependencyNode,
}

impl<T: Element> DenseState<T> {
    pub(crate) fn new(rows: usize, cols: usize, data: Vec<T>) -> Arc<Self> {
        debug_assert_eq!(data.len(), rows * cols);
        Arc::new(Self {
            rows,
            cols,
            data: RwLock::new(data),
            node: DependencyNode::new(),
        })
    }

    pub(crate) fn zeroed(rows: usize, cols: usize) -> Arc<Self> {
        Self::new(rows, cols, vec![T::default(); rows * cols])
    }
}

impl<T> Tracked for DenseState<T> {
    fn dependencies(&self) -> &DependencyNode {
        &self.node
    }
}

/// Handle to a container's storage, captured by task bodies.
///
/// Only access the elements from inside a task declared against
/// [`dependencies`](Tracked::dependencies): `read` from readers, `write`
/// from the writer.
pub struct DenseClosure<T> {
    state: Arc<DenseState<T>>,
}

impl<T> Clone for DenseClosure<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Element> DenseClosure<T> {
    /// Zeroed storage not owned by any container, for closure temporaries.
    pub(crate) fn zeroed(rows: usize, cols: usize) -> Self {
        Self {
            state: DenseState::zeroed(rows, cols),
        }
    }
}

impl<T> DenseClosure<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.state.rows * self.state.cols
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows (the length, for vectors).
    pub fn rows(&self) -> usize {
        self.state.rows
    }

    /// Number of columns (1, for vectors).
    pub fn cols(&self) -> usize {
        self.state.cols
    }

    /// Shared access to the elements, in row-major order.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.state.data.read()
    }

    /// Exclusive access to the elements, in row-major order.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.state.data.write()
    }
}

impl<T> Tracked for DenseClosure<T> {
    fn dependencies(&self) -> &DependencyNode {
        &self.state.node
    }
}

impl<T> fmt::Debug for DenseClosure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseClosure")
            .field("rows", &self.state.rows)
            .field("cols", &self.state.cols)
            .field("node", &self.state.node.id())
            .finish()
    }
}

/// State plus the scheduler it is bound to. Shared by every container type.
pub(crate) struct Storage<T: Element> {
    state: Arc<DenseState<T>>,
    scheduler: SchedulerHandle,
}

impl<T: Element> Storage<T> {
    pub(crate) fn new(scheduler: SchedulerHandle, state: Arc<DenseState<T>>) -> Self {
        Self { state, scheduler }
    }

    pub(crate) fn rows(&self) -> usize {
        self.state.rows
    }

    pub(crate) fn cols(&self) -> usize {
        self.state.cols
    }

    pub(crate) fn len(&self) -> usize {
        self.state.rows * self.state.cols
    }

    pub(crate) fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    pub(crate) fn dependencies(&self) -> &DependencyNode {
        &self.state.node
    }

    pub(crate) fn closure(&self) -> DenseClosure<T> {
        DenseClosure {
            state: Arc::clone(&self.state),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state.node.is_idle()
    }

    pub(crate) fn wait(&self) -> Result<()> {
        self.state.node.wait()
    }

    /// Write `value` everywhere, directly if nothing is in flight.
    ///
    /// A poisoned variable is left untouched on both paths: the scheduled
    /// fill is skipped, so the direct one is too.
    pub(crate) fn fill(&self, value: T) -> Option<WorkId> {
        if self.is_ready() {
            if !self.state.node.is_poisoned() {
                kernels::fill(&mut self.state.data.write(), value);
            }
            return None;
        }
        let target = self.closure();
        Some(self.scheduler.spawn(
            move || kernels::fill(&mut target.write(), value),
            &self.state.node,
            &[],
        ))
    }

    pub(crate) fn to_vec(&self) -> Result<Vec<T>> {
        self.wait()?;
        Ok(self.state.data.read().clone())
    }

    /// A new variable of the same shape holding a copy of the elements.
    ///
    /// Copying a poisoned variable yields a poisoned copy.
    pub(crate) fn duplicate(&self) -> Self {
        if self.is_ready() {
            let data = self.state.data.read().clone();
            let copy = Self::new(
                self.scheduler.clone(),
                DenseState::new(self.state.rows, self.state.cols, data),
            );
            if self.state.node.is_poisoned() {
                copy.state.node.poison();
            }
            return copy;
        }
        let copy = Self::new(
            self.scheduler.clone(),
            DenseState::zeroed(self.state.rows, self.state.cols),
        );
        let (dst, src) = (copy.closure(), self.closure());
        self.scheduler.spawn(
            move || dst.write().copy_from_slice(&src.read()),
            copy.dependencies(),
            &[self.dependencies()],
        );
        copy
    }

    /// Swap in a fresh zeroed state of the given shape; the old one is retired.
    pub(crate) fn reshape(&mut self, rows: usize, cols: usize) {
        if rows == self.state.rows && cols == self.state.cols {
            return;
        }
        let fresh = Self::new(self.scheduler.clone(), DenseState::zeroed(rows, cols));
        let old = std::mem::replace(self, fresh);
        drop(old);
    }
}

impl<T: Element> Drop for Storage<T> {
    fn drop(&mut self) {
        if !self.state.node.is_idle() {
            trace!(node = %self.state.node.id(), "handing in-flight storage to the scheduler");
            self.scheduler.make_closure_variable(Arc::clone(&self.state));
        }
    }
}

/// Reject operands bound to a different scheduler than `target`.
pub(crate) fn check_operands<T: Element>(
    op: &'static str,
    target: &Storage<T>,
    others: &[&Storage<T>],
) -> Result<()> {
    for other in others {
        if !target.scheduler.same_scheduler(&other.scheduler) {
            return Err(SchedulerError::SchedulerMismatch { op });
        }
    }
    Ok(())
}

pub(crate) fn check_size(op: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(SchedulerError::SizeMismatch {
            op,
            expected,
            found,
        });
    }
    Ok(())
}
