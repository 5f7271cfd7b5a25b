//! Tracked Dense Containers
//!
//! [`Vector`], [`Matrix`] and [`Scalar`] pair element storage with a
//! [`DependencyNode`](crate::graph::DependencyNode). Operations in
//! [`ops`](crate::ops) schedule work against them; the containers themselves
//! only block in [`wait`](Vector::wait) and the accessors built on it.
//!
//! # Ownership
//!
//! Storage lives in a shared state that task bodies capture through a
//! closure handle. When a container is dropped, resized or replaced while
//! tasks still use its storage, the old state is handed to the scheduler as
//! a closure variable and freed after those tasks complete.

mod matrix;
mod scalar;
mod storage;
mod vector;

pub use matrix::{Matrix, MatrixClosure};
pub use scalar::Scalar;
pub use storage::DenseClosure;
pub use vector::{Vector, VectorClosure};

pub(crate) use storage::{check_operands, check_size};
