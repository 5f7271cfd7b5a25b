use std::fmt;

use crate::closure::Tracked;
use crate::error::Result;
use crate::graph::{DependencyNode, SchedulerHandle, WorkId};
use crate::kernels::Element;
use crate::runtime;

use super::storage::{DenseClosure, DenseState, Storage};

/// Closure handle of a [`Vector`].
pub type VectorClosure<T> = DenseClosure<T>;

/// Dense vector whose contents may be produced by scheduled tasks.
///
/// Dropping a vector never blocks: if tasks still use it, its storage is
/// handed to the scheduler and freed once they finish.
pub struct Vector<T: Element> {
    pub(crate) storage: Storage<T>,
}

impl<T: Element> Vector<T> {
    /// Zeroed vector on the process-wide scheduler.
    pub fn new(len: usize) -> Self {
        Self::new_in(&runtime::scheduler().handle(), len)
    }

    /// Zeroed vector on `scheduler`.
    pub fn new_in(scheduler: &SchedulerHandle, len: usize) -> Self {
        Self::with_state(scheduler, DenseState::zeroed(len, 1))
    }

    /// Vector of `len` copies of `value` on the process-wide scheduler.
    pub fn from_elem(len: usize, value: T) -> Self {
        Self::from_elem_in(&runtime::scheduler().handle(), len, value)
    }

    /// Like [`from_elem`](Self::from_elem), on `scheduler`.
    pub fn from_elem_in(scheduler: &SchedulerHandle, len: usize, value: T) -> Self {
        Self::with_state(scheduler, DenseState::new(len, 1, vec![value; len]))
    }

    /// Take ownership of `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self::from_vec_in(&runtime::scheduler().handle(), data)
    }

    /// Take ownership of `data`, on `scheduler`.
    pub fn from_vec_in(scheduler: &SchedulerHandle, data: Vec<T>) -> Self {
        let len = data.len();
        Self::with_state(scheduler, DenseState::new(len, 1, data))
    }

    fn with_state(scheduler: &SchedulerHandle, state: std::sync::Arc<DenseState<T>>) -> Self {
        Self {
            storage: Storage::new(scheduler.clone(), state),
        }
    }

    /// Number of elements. Known without waiting.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether no task currently claims this vector. Advisory.
    pub fn is_ready(&self) -> bool {
        self.storage.is_ready()
    }

    /// Block until every task touching this vector has finished.
    pub fn wait(&self) -> Result<()> {
        self.storage.wait()
    }

    /// The node that orders tasks on this vector.
    pub fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }

    /// Handle for task bodies that read or write this vector.
    pub fn closure(&self) -> VectorClosure<T> {
        self.storage.closure()
    }

    /// The scheduler this vector was created on.
    pub fn scheduler(&self) -> &SchedulerHandle {
        self.storage.scheduler()
    }

    /// Set every element to zero. See [`fill`](Self::fill).
    pub fn clear(&mut self) -> Option<WorkId> {
        self.fill(T::default())
    }

    /// Set every element to `value`.
    ///
    /// Runs on the calling thread when the vector is ready, otherwise spawns
    /// a task and returns its id.
    pub fn fill(&mut self, value: T) -> Option<WorkId> {
        self.storage.fill(value)
    }

    /// Switch to zeroed storage of length `len`. Never blocks.
    pub fn resize(&mut self, len: usize) {
        self.storage.reshape(len, 1);
    }

    /// Wait for pending tasks, then copy the elements out.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.storage.to_vec()
    }

    /// Wait for pending tasks, then read element `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn get(&self, i: usize) -> Result<T> {
        self.wait()?;
        Ok(self.storage.closure().read()[i])
    }

    /// Move `other`'s contents into `self`. The previous contents are
    /// released once the tasks using them finish.
    pub fn replace(&mut self, mut other: Self) {
        std::mem::swap(&mut self.storage, &mut other.storage);
    }
}

impl<T: Element> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.duplicate(),
        }
    }
}

impl<T: Element> Tracked for Vector<T> {
    fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }
}

impl<T: Element> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("len", &self.len())
            .field("node", &self.dependencies().id())
            .field("ready", &self.is_ready())
            .finish()
    }
}
