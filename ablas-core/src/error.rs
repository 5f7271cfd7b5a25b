//! Error Types
//!
//! Every fallible operation in the crate returns [`SchedulerError`]. Contract
//! violations such as mismatched operand sizes are detected before a task is
//! admitted, so a returned error means nothing was scheduled.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced by the scheduler, its pool and the scheduled operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    /// Operand sizes disagree.
    #[error("{op}: size mismatch (expected {expected}, found {found})")]
    SizeMismatch {
        /// Name of the rejected operation.
        op: &'static str,
        /// Size required by the other operands.
        expected: usize,
        /// Size actually supplied.
        found: usize,
    },

    /// Operands of one operation belong to different schedulers.
    #[error("{op}: operands are bound to different schedulers")]
    SchedulerMismatch {
        /// Name of the rejected operation.
        op: &'static str,
    },

    /// The pool configuration was rejected.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The worker threads could not be started.
    #[error("failed to build worker pool")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// The process-wide scheduler was already created.
    #[error("process-wide scheduler is already initialized")]
    AlreadyInitialized,

    /// The variable was last written by a task that failed or was skipped.
    #[error("variable {node} is poisoned by a failed task")]
    Poisoned {
        /// The poisoned dependency node.
        node: NodeId,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_names_operation() {
        let err = SchedulerError::SizeMismatch {
            op: "gemv",
            expected: 3,
            found: 4,
        };
        assert_eq!(
            err.to_string(),
            "gemv: size mismatch (expected 3, found 4)"
        );
    }
}
