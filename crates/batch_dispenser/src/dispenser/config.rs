//! src/dispenser/config.rs
//!
//! Configuration for the batch dispenser.
//!
//! The `DispenserConfig` struct stores the batch shape, the publish-lag
//! deadline and the worker pool parameters.
//!
//! Example:
//! ```ignore
//! let config = DispenserConfig::builder()
//!     .batch_size(32)
//!     .feature_width(1024)
//!     .label_width(16)
//!     .num_workers(4)
//!     .lag_timeout(Duration::from_secs(10))
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `num_workers`: more workers overlap more transform calls, but a slow
//!                  worker holds back everyone once the lag window fills
//! - `prefetch_factor`: batches buffered per worker between the pool and
//!                      its consumers
//! - `lag_timeout`: `None` waits forever on a stalled worker

use std::time::Duration;

use crate::error::{DispenserError, Result};

/// Configuration for the dispenser and its worker pool
#[derive(Debug, Clone)]
pub struct DispenserConfig {
    /// Maximum number of rows per batch (must be > 0)
    pub batch_size: usize,
    /// Length of every feature vector produced by the transform
    pub feature_width: usize,
    /// Length of every label vector produced by the transform
    pub label_width: usize,
    /// Seed for the reshuffle RNG. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Maximum time a batch may wait for the lag window before
    /// `next()` fails with `LagTimeout`. `None` waits indefinitely. Default: 30s
    pub lag_timeout: Option<Duration>,
    /// Number of worker threads spawned by `WorkerPool` (default 1)
    pub num_workers: usize,
    /// Batches buffered per worker in the pool's output channel (default 2)
    pub prefetch_factor: usize,
    /// How often blocked pool workers check for shutdown.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub worker_timeout: Duration,
    /// Maximum time a pool consumer waits for a batch. Default: 30s
    pub recv_timeout: Duration,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            feature_width: 1,
            label_width: 1,
            seed: None,
            lag_timeout: Some(Duration::from_secs(30)),
            num_workers: 1,
            prefetch_factor: 2,
            worker_timeout: Duration::from_millis(100),
            recv_timeout: Duration::from_secs(30),
        }
    }
}

impl DispenserConfig {
    pub fn builder() -> DispenserConfigBuilder {
        DispenserConfigBuilder::default()
    }

    /// Checks the shape parameters used by `Loader` construction.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DispenserError::config("batch_size must be greater than 0"));
        }
        if self.feature_width == 0 {
            return Err(DispenserError::config(
                "feature_width must be greater than 0",
            ));
        }
        if self.label_width == 0 {
            return Err(DispenserError::config("label_width must be greater than 0"));
        }
        if self.lag_timeout == Some(Duration::ZERO) {
            return Err(DispenserError::config(
                "lag_timeout must be non-zero (use None to wait indefinitely)",
            ));
        }
        Ok(())
    }

    /// Checks the parameters used by `WorkerPool`.
    pub fn validate_pool(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(DispenserError::config(
                "Cannot create WorkerPool with 0 workers",
            ));
        }
        if self.prefetch_factor == 0 {
            return Err(DispenserError::config(
                "prefetch_factor must be > 0 to prevent deadlocks",
            ));
        }
        if self.worker_timeout.is_zero() {
            return Err(DispenserError::config(
                "worker_timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for DispenserConfig with method chaining
#[derive(Default)]
pub struct DispenserConfigBuilder {
    config: DispenserConfig,
}

impl DispenserConfigBuilder {
    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn feature_width(mut self, width: usize) -> Self {
        self.config.feature_width = width;
        self
    }

    pub fn label_width(mut self, width: usize) -> Self {
        self.config.label_width = width;
        self
    }

    /// Seed the reshuffle RNG for reproducible pass orders.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the publish deadline.
    ///
    /// - Too low: healthy but slow transforms on an earlier batch fail later batches
    /// - Too high: delays detection of a stalled worker
    pub fn lag_timeout(mut self, timeout: Duration) -> Self {
        self.config.lag_timeout = Some(timeout);
        self
    }

    /// Wait for the lag window forever, as the unguarded design does.
    pub fn wait_indefinitely(mut self) -> Self {
        self.config.lag_timeout = None;
        self
    }

    /// Set the number of pool workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    /// Set the number of batches buffered per pool worker.
    pub fn prefetch_factor(mut self, factor: usize) -> Self {
        self.config.prefetch_factor = factor;
        self
    }

    /// Set the worker polling interval
    ///
    /// - Too low: more responsive shutdown, higher CPU usage.
    /// - Too high: less CPU overhead, slower shutdown response
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    /// Set how long pool consumers wait for a batch.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout = timeout;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> DispenserConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispenserConfig::default();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.lag_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.prefetch_factor, 2);
        assert!(config.validate().is_ok());
        assert!(config.validate_pool().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = DispenserConfig::builder()
            .batch_size(32)
            .feature_width(128)
            .label_width(8)
            .seed(7)
            .num_workers(4)
            .prefetch_factor(3)
            .lag_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.batch_size, 32);
        assert_eq!(config.feature_width, 128);
        assert_eq!(config.label_width, 8);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.prefetch_factor, 3);
        assert_eq!(config.lag_timeout, Some(Duration::from_millis(250)));

        let forever = DispenserConfig::builder().wait_indefinitely().build();
        assert_eq!(forever.lag_timeout, None);
    }

    #[test]
    fn test_validation_errors() {
        let zero_batch = DispenserConfig::builder().batch_size(0).build();
        assert!(matches!(
            zero_batch.validate(),
            Err(DispenserError::Config { .. })
        ));

        let zero_features = DispenserConfig::builder().feature_width(0).build();
        assert!(zero_features.validate().is_err());

        let zero_labels = DispenserConfig::builder().label_width(0).build();
        assert!(zero_labels.validate().is_err());

        let zero_timeout = DispenserConfig::builder()
            .lag_timeout(Duration::ZERO)
            .build();
        assert!(zero_timeout.validate().is_err());

        let no_workers = DispenserConfig::builder().num_workers(0).build();
        assert!(no_workers.validate().is_ok());
        assert!(no_workers.validate_pool().is_err());

        let no_prefetch = DispenserConfig::builder().prefetch_factor(0).build();
        assert!(no_prefetch.validate_pool().is_err());
    }
}
