//! src/pipeline/config.rs
//!
//! Configuration for a pipeline run.
//!
//! The `PipelineConfig` struct stores the record count, the two pool sizes
//! and the timing knobs that control how a run behaves.
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .num_records(10)
//!     .generation_workers(3)
//!     .processing_workers(5)
//!     .build();
//! config.validate()?;
//! ```
//!
//! # Sizing
//! - Both conduits are created with capacity `num_records`, so producers never
//!   block on a full queue regardless of pool sizes.
//! - Pool sizes default to `num_records` (one worker per record) when unset.
//!   Correctness never depends on the ratio between pool size and record count.

use anyhow::{ensure, Result};
use std::time::Duration;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total number of records to generate and process (must be > 0)
    pub num_records: usize,
    /// Size of the generation pool (defaults to `num_records` if not specified)
    pub generation_workers: Option<usize>,
    /// Size of the processing pool (defaults to `num_records` if not specified)
    pub processing_workers: Option<usize>,
    /// Simulated cost of synthesizing one record. Default: 100ms
    pub generation_delay: Duration,
    /// Simulated cost of persisting one record. Default: 1s
    pub processing_delay: Duration,
    /// Upper bound (exclusive) on the generated activity log length. Default: 1000
    pub max_log_entries: usize,
    /// Base seed for worker RNGs. A random seed is drawn when unset.
    pub seed: Option<u64>,
    /// Optional deadline for a collector waiting on the next item.
    /// If exceeded, the run is cancelled. Default: None (wait as long as the
    /// handler takes)
    pub timeout: Option<Duration>,
    /// How often idle workers check for the shutdown signal.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub worker_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_records: 100,
            generation_workers: None,
            processing_workers: None,
            generation_delay: Duration::from_millis(100),
            processing_delay: Duration::from_secs(1),
            max_log_entries: 1000,
            seed: None,
            timeout: None,
            worker_timeout: Duration::from_millis(100),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Effective generation pool size.
    pub fn generation_pool_size(&self) -> usize {
        self.generation_workers.unwrap_or(self.num_records)
    }

    /// Effective processing pool size.
    pub fn processing_pool_size(&self) -> usize {
        self.processing_workers.unwrap_or(self.num_records)
    }

    /// Capacity of every conduit in the run. Sized to the whole workload.
    pub fn conduit_capacity(&self) -> usize {
        self.num_records
    }

    /// Rejects configurations that cannot run to completion.
    ///
    /// Must be called before any pool is started.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.num_records > 0,
            "Record count must be greater than 0 (got {})",
            self.num_records
        );
        ensure!(
            self.generation_pool_size() > 0,
            "Generation pool size must be greater than 0"
        );
        ensure!(
            self.processing_pool_size() > 0,
            "Processing pool size must be greater than 0"
        );
        ensure!(
            !self.worker_timeout.is_zero(),
            "Worker polling interval must be non-zero"
        );
        ensure!(
            self.timeout.map_or(true, |timeout| !timeout.is_zero()),
            "Collector timeout must be non-zero when set"
        );
        Ok(())
    }
}

/// Builder for PipelineConfig with method chaining
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of records (must be > 0)
    pub fn num_records(mut self, count: usize) -> Self {
        self.config.num_records = count;
        self
    }

    /// Set the generation pool size (must be > 0)
    pub fn generation_workers(mut self, workers: usize) -> Self {
        self.config.generation_workers = Some(workers);
        self
    }

    /// Set the processing pool size (must be > 0)
    pub fn processing_workers(mut self, workers: usize) -> Self {
        self.config.processing_workers = Some(workers);
        self
    }

    pub fn generation_delay(mut self, delay: Duration) -> Self {
        self.config.generation_delay = delay;
        self
    }

    pub fn processing_delay(mut self, delay: Duration) -> Self {
        self.config.processing_delay = delay;
        self
    }

    pub fn max_log_entries(mut self, max: usize) -> Self {
        self.config.max_log_entries = max;
        self
    }

    /// Set the random seed for reproducible payloads.
    ///
    /// Record identifiers never depend on the seed; only the randomness drawn
    /// by generators and handlers does.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Cancel the run when a collector waits longer than `timeout` for the
    /// next item. Unset by default.
    ///
    /// - Too low: Aborts runs whose handlers are legitimately slow
    /// - Too high: Delays detection of a stage that will never finish.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the worker polling interval
    ///
    /// - Too low: More responsive shutdown, higher CPU usage.
    /// - Too high: Less CPU overhead, slower shutdown response
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
