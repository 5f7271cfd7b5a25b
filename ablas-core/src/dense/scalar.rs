use std::fmt;

use crate::closure::Tracked;
use crate::error::Result;
use crate::graph::{DependencyNode, SchedulerHandle};
use crate::kernels::Element;

use super::storage::{DenseClosure, DenseState, Storage};

/// A single value produced asynchronously, such as the result of a dot
/// product.
pub struct Scalar<T: Element> {
    pub(crate) storage: Storage<T>,
}

impl<T: Element> Scalar<T> {
    /// Scalar holding `value` on `scheduler`. Usually created by an
    /// operation such as [`dot`](crate::ops::vector::dot).
    pub fn new_in(scheduler: &SchedulerHandle, value: T) -> Self {
        Self {
            storage: Storage::new(scheduler.clone(), DenseState::new(1, 1, vec![value])),
        }
    }

    /// Whether the producing task has finished. Advisory.
    pub fn is_ready(&self) -> bool {
        self.storage.is_ready()
    }

    /// Block until the producing task has finished.
    pub fn wait(&self) -> Result<()> {
        self.storage.wait()
    }

    /// Wait for the producing task, then read the value.
    pub fn value(&self) -> Result<T> {
        self.wait()?;
        Ok(self.storage.closure().read()[0])
    }

    /// The node that orders tasks on this scalar.
    pub fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }

    /// Handle for the task body that writes the value.
    pub fn closure(&self) -> DenseClosure<T> {
        self.storage.closure()
    }
}

impl<T: Element> Tracked for Scalar<T> {
    fn dependencies(&self) -> &DependencyNode {
        self.storage.dependencies()
    }
}

impl<T: Element> fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scalar")
            .field("node", &self.dependencies().id())
            .field("ready", &self.is_ready())
            .finish()
    }
}
