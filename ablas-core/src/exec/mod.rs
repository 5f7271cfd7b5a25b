//! Execution
//!
//! The worker pool that runs task bodies and the configuration it is built
//! from. The scheduler is agnostic to what the bodies compute.

mod config;
mod pool;

pub use config::{PoolConfig, NUM_THREADS_ENV};
pub use pool::ExecutionPool;
