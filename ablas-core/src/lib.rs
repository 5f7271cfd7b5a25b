//! aBLAS Core
//!
//! This crate provides the asynchronous execution core of the aBLAS dense
//! linear-algebra library. Operations on vectors and matrices return as soon
//! as they are scheduled; a dependency graph orders them so the results are
//! the same as if they had run one after another.
//!
//! It implements:
//!
//! - Dependency nodes tracking the pending readers and writer of a variable
//! - A scheduler that admits tasks and dispatches them when they are ready
//! - A worker pool that runs task bodies
//! - Closures that keep temporaries alive until the tasks using them finish
//! - Tracked dense containers and the operations scheduled on them
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Dependency nodes, work items and the scheduler
//! - `exec`: Worker pool and its configuration
//! - `closure`: Ownership transfer of temporaries to the scheduler
//! - `runtime`: The process-wide scheduler instance
//! - `dense`: `Vector`, `Matrix` and `Scalar` containers
//! - `ops`: Scheduled vector and matrix operations
//! - `kernels`: Numeric loops run inside task bodies
//!
//! # Example
//!
//! ```no_run
//! use ablas_core::dense::Matrix;
//! use ablas_core::ops::matrix;
//!
//! let x = Matrix::from_elem(100, 100, 1.0f64);
//! let y = Matrix::from_elem(100, 100, 0.01f64);
//! let mut r = Matrix::new(100, 100);
//!
//! for _ in 0..20 {
//!     // r += 2x + x y, without waiting for anything
//!     matrix::plus_assign(&mut r, &x, 2.0)?;
//!     let p = matrix::prod_async(&x, &y)?;
//!     matrix::plus_assign(&mut r, &p, 1.0)?;
//!     // `p` is freed by the scheduler once the update has read it
//! }
//!
//! let value: f64 = r.get(0, 0)?;
//! assert!((value - 60.0).abs() < 1e-9);
//! ablas_core::runtime::wait();
//! # Ok::<(), ablas_core::SchedulerError>(())
//! ```

pub mod closure;
pub mod dense;
pub mod error;
pub mod exec;
pub mod graph;
pub mod kernels;
pub mod ops;
pub mod runtime;

pub use closure::{ClosureId, Tracked};
pub use dense::{Matrix, Scalar, Vector};
pub use error::{Result, SchedulerError};
pub use exec::PoolConfig;
pub use graph::{DependencyNode, Scheduler, SchedulerHandle, WorkId};
