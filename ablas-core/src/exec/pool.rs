//! Execution Pool
//!
//! A fixed-size set of worker threads running dispatched task bodies. The
//! pool knows nothing about dependencies: the scheduler only hands it jobs
//! whose predecessors have all completed, wrapped so that completion is
//! reported back when the body returns.

use std::fmt;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::config::PoolConfig;
use crate::error::Result;
use crate::graph::Job;

/// Fixed-size worker pool.
///
/// Independently submitted jobs run in any order, possibly all at once.
/// Once submitted a job always runs to completion.
pub struct ExecutionPool {
    pool: ThreadPool,
    num_workers: usize,
}

impl ExecutionPool {
    /// Start the worker threads described by `config`.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .stack_size(config.stack_size)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        debug!(workers = config.num_workers, "execution pool started");
        Ok(Self {
            pool,
            num_workers: config.num_workers,
        })
    }

    /// Submit a job. Returns immediately.
    pub fn execute(&self, job: Job) {
        self.pool.spawn(job);
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Whether the calling thread is one of this pool's workers.
    pub fn is_worker_thread(&self) -> bool {
        self.pool.current_thread_index().is_some()
    }
}

impl fmt::Debug for ExecutionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPool")
            .field("num_workers", &self.num_workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};

    #[test]
    fn pool_runs_every_job() {
        let pool = ExecutionPool::new(&PoolConfig::with_workers(3)).unwrap();
        assert_eq!(pool.num_workers(), 3);

        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            }));
        }
        for _ in 0..50 {
            rx.recv().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn workers_are_named() {
        let config = PoolConfig {
            num_workers: 1,
            thread_name_prefix: "unit".to_string(),
            ..PoolConfig::default()
        };
        let pool = ExecutionPool::new(&config).unwrap();
        assert!(!pool.is_worker_thread());

        let (tx, rx) = mpsc::channel();
        pool.execute(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }));
        assert_eq!(rx.recv().unwrap().as_deref(), Some("unit-0"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ExecutionPool::new(&PoolConfig::with_workers(0)).is_err());
    }
}
