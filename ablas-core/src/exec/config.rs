//! Pool Configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Environment variable overriding the number of worker threads.
pub const NUM_THREADS_ENV: &str = "ABLAS_NUM_THREADS";

/// Configuration of the execution pool.
///
/// The pool size is fixed for the lifetime of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub num_workers: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads, in bytes.
    pub stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus(),
            thread_name_prefix: "ablas-worker".to_string(),
            stack_size: 2 * 1024 * 1024, // 2 MB
        }
    }
}

impl PoolConfig {
    /// Configuration with an explicit worker count and default everything else.
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    /// Defaults, with [`NUM_THREADS_ENV`] applied when it is set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(NUM_THREADS_ENV) {
            config.num_workers = parse_workers(&raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(SchedulerError::InvalidConfig(
                "num_workers must be > 0".to_string(),
            ));
        }
        if self.stack_size == 0 {
            return Err(SchedulerError::InvalidConfig(
                "stack_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_workers(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(SchedulerError::InvalidConfig(format!(
            "{NUM_THREADS_ENV}={raw:?} is not a positive integer"
        ))),
        Ok(n) => Ok(n),
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PoolConfig::default();
        assert!(config.num_workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let err = PoolConfig::with_workers(0).validate().unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn worker_count_parsing() {
        assert_eq!(parse_workers(" 6 ").unwrap(), 6);
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PoolConfig = serde_json::from_str(r#"{"num_workers": 3}"#).unwrap();
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.thread_name_prefix, "ablas-worker");

        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
