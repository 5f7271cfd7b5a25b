use std::fmt;
use std::sync::Arc;

use crate::closure::Tracked;
use crate::error::Result;
use crate::graph::{DependencyNode, SchedulerHandle, WorkId};
use crate::kernels::Element;
use crate::runtime;

use super::storage::{check_size, DenseClosure, DenseState, Storage};

/// Closure handle of a [`Matrix`]. Elements are row-major.
pub type MatrixClosure<T> = DenseClosure<T>;

/// Dense row-major matrix whose contents may be produced by scheduled tasks.
pub struct Matrix<T: Element> {
    pub(crate) storage: Storage<T>,
}

impl<T: Element> Matrix<T> {
    /// Zeroed `rows x cols` matrix on the process-wide scheduler.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::new_in(&runtime::scheduler().handle(), rows, cols)
    }

    /// Zeroed `rows x cols` matrix on `scheduler`.
    pub fn new_in(scheduler: &SchedulerHandle, rows: usize, cols: usize) -> Self {
        Self::with_state(scheduler, DenseState::zeroed(rows, cols))
    }

    /// Matrix filled with `value`.
    pub fn from_elem(rows: usize, cols: usize, value: T) -> Self {
        Self::from_elem_in(&runtime::scheduler().handle(), rows, cols, value)
    }

    /// Matrix filled with `value`, on `scheduler`.
    pub fn from_elem_in(scheduler: &SchedulerHandle, rows: usize, cols: usize, value: T) -> Self {
        Self::with_state(scheduler, DenseState::new(rows, cols, vec![value; rows * cols]))
    }

    /// Build from row-major `data`, which must hold `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        Self::from_vec_in(&runtime::scheduler().handle(), rows, cols, data)
    }

    /// Like [`from_vec`](Self::from_vec), on `scheduler`.
    ///
    /// Fails with [`SizeMismatch`](crate::SchedulerError::SizeMismatch) if
    /// `data` has the wrong length.
    pub fn from_vec_in(
        scheduler: &SchedulerHandle,
        rows: usize,
        cols: usize,
        data: Vec<T>,
    ) -> Result<Self> {
        check_size("Matrix::from_vec", rows * cols, data.len())?;
        Ok(Self::with_state(scheduler, DenseState::new(rows, cols, data)))
    }

    fn with_state(scheduler: &SchedulerHandle, state: Arc<DenseState<T>>) -> Self {
        Self {
            storage: Storage::new(scheduler.clone(), state),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.storage.rows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.storage.cols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether no task currently claims this matrix. Advisory.
    pub fn is_ready(&self) -> bool {
        self.storage.is_ready()
    }

    /// Block until every task touching this matrix has finished.
    ///
    /// Reports [`Poisoned`](crate::SchedulerError::Poisoned) if one of them
    /// failed.
    pub fn wait(&self) -> Result<()> {
        self.storage.wait()
    }

    /// The node that orders tasks on this matrix.
    pub fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }

    /// Handle for task bodies that read or write this matrix.
    pub fn closure(&self) -> MatrixClosure<T> {
        self.storage.closure()
    }

    /// The scheduler this matrix was created on.
    pub fn scheduler(&self) -> &SchedulerHandle {
        self.storage.scheduler()
    }

    /// Set every element to zero.
    pub fn clear(&mut self) -> Option<WorkId> {
        self.fill(T::default())
    }

    /// Set every element to `value`, directly when the matrix is ready.
    pub fn fill(&mut self, value: T) -> Option<WorkId> {
        self.storage.fill(value)
    }

    /// Switch to zeroed storage of the new shape. Never blocks.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.storage.reshape(rows, cols);
    }

    /// Wait for pending tasks, then copy the row-major elements out.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.storage.to_vec()
    }

    /// Wait for pending tasks, then read element `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        assert!(i < self.rows() && j < self.cols(), "index ({i}, {j}) out of bounds");
        self.wait()?;
        Ok(self.storage.closure().read()[i * self.cols() + j])
    }

    /// Move `other`'s contents into `self`, releasing the previous contents
    /// once the tasks using them finish.
    pub fn replace(&mut self, mut other: Self) {
        std::mem::swap(&mut self.storage, &mut other.storage);
    }
}

impl<T: Element> Clone for Matrix<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.duplicate(),
        }
    }
}

impl<T: Element> Tracked for Matrix<T> {
    fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }
}

impl<T: Element> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("node", &self.dependencies().id())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use crate::exec::PoolConfig;
    use crate::graph::Scheduler;

    #[test]
    fn from_vec_checks_shape() {
        let s = Scheduler::new(PoolConfig::with_workers(1)).unwrap();
        let m = Matrix::from_vec_in(&s, 2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(1, 0).unwrap(), 4);

        let err = Matrix::from_vec_in(&s, 2, 2, vec![1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::SizeMismatch {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn fill_and_resize() {
        let s = Scheduler::new(PoolConfig::with_workers(1)).unwrap();
        let mut m = Matrix::from_elem_in(&s, 2, 2, 1.0);
        m.fill(3.0);
        assert_eq!(m.to_vec().unwrap(), vec![3.0; 4]);
        m.resize(1, 3);
        assert_eq!(m.shape(), (1, 3));
        assert_eq!(m.to_vec().unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn debug_output_names_shape() {
        let s = Scheduler::new(PoolConfig::with_workers(1)).unwrap();
        let m = Matrix::<f32>::new_in(&s, 4, 5);
        let text = format!("{m:?}");
        assert!(text.contains("rows: 4"));
        assert!(text.contains("cols: 5"));
    }
}
