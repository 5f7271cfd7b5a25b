//! Process-Wide Scheduler
//!
//! Containers and scheduled operations that are not bound to an explicit
//! [`Scheduler`] use a single process-wide instance.
//!
//! # Lifecycle
//!
//! 1. The instance is created on first use from [`PoolConfig::from_env`], or
//!    from the configuration passed to [`install`] if that ran first.
//!
//! 2. Statics are never dropped, so the instance does not drain by itself at
//!    process exit. Call [`wait`] before returning from `main`, or hold the
//!    guard returned by [`drain_on_drop`].

use std::sync::OnceLock;

use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::exec::PoolConfig;
use crate::graph::Scheduler;

static GLOBAL: OnceLock<Scheduler> = OnceLock::new();

fn build_default() -> Scheduler {
    let config = PoolConfig::from_env().unwrap_or_else(|err| {
        warn!(%err, "ignoring pool configuration from environment");
        PoolConfig::default()
    });
    match Scheduler::new(config) {
        Ok(scheduler) => scheduler,
        Err(err) => {
            warn!(%err, "falling back to a single worker");
            match Scheduler::new(PoolConfig::with_workers(1)) {
                Ok(scheduler) => scheduler,
                Err(err) => panic!("cannot start the process-wide worker pool: {err}"),
            }
        }
    }
}

/// The process-wide scheduler, created on first use.
pub fn scheduler() -> &'static Scheduler {
    GLOBAL.get_or_init(build_default)
}

/// Create the process-wide scheduler with an explicit configuration.
///
/// Fails with [`SchedulerError::AlreadyInitialized`] once the instance exists.
pub fn install(config: PoolConfig) -> Result<&'static Scheduler> {
    if GLOBAL.get().is_some() {
        return Err(SchedulerError::AlreadyInitialized);
    }
    let instance = Scheduler::new(config)?;
    GLOBAL
        .set(instance)
        .map_err(|_| SchedulerError::AlreadyInitialized)?;
    Ok(scheduler())
}

/// Whether the process-wide scheduler has been created.
pub fn is_initialized() -> bool {
    GLOBAL.get().is_some()
}

/// Block until the process-wide scheduler has no work left.
///
/// Returns immediately if it was never created.
pub fn wait() {
    if let Some(scheduler) = GLOBAL.get() {
        scheduler.wait();
    }
}

/// Guard that drains the process-wide scheduler when dropped.
#[must_use = "the scheduler is drained when the guard is dropped"]
pub struct DrainGuard {
    _private: (),
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        wait();
    }
}

/// Return a guard that calls [`wait`] when it goes out of scope.
pub fn drain_on_drop() -> DrainGuard {
    DrainGuard { _private: () }
}
