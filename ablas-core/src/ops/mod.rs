//! Scheduled Operations
//!
//! Each function validates its operands, spawns one task and returns without
//! waiting. The task writes the first argument and reads the others, so
//! operations on the same containers run in the order they were called.
//!
//! ```no_run
//! use ablas_core::dense::Vector;
//! use ablas_core::ops::vector;
//!
//! let mut x = Vector::from_elem(4, 1.0);
//! let y = Vector::from_elem(4, 2.0);
//! vector::plus_assign(&mut x, &y, 0.5)?;
//! let d = vector::dot(&x, &y)?;
//! assert_eq!(d.value()?, 16.0);
//! # Ok::<(), ablas_core::SchedulerError>(())
//! ```

pub mod matrix;
pub mod vector;
