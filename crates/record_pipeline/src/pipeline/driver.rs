//! src/pipeline/driver.rs
//!
//! The `Pipeline` driver sequences the two stages.
//!
//! ```text
//!   0..N ──► [requests] ──► generation pool ──► [records] ──► RecordCollector
//!                                                                   │
//!                                                   barrier: all N records held
//!                                                                   │
//!   records ──► [work queue] ──► processing pool ──► [results] ──► ResultCollector
//!                                                                   │
//!                                                             PipelineReport
//! ```
//!
//! The driver owns every conduit and pool. For each stage it submits the
//! whole workload, closes the task conduit (all sends come first, on this
//! thread), drains exactly N outputs, joins the pool and checks that every
//! task taken produced exactly one output.

use anyhow::{ensure, Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;

use super::collector::{RecordCollector, ResultCollector};
use super::config::PipelineConfig;
use super::handler::{ResultToken, SimulatedPersistence, UnitOfWorkHandler};
use super::report::{PipelineReport, StageReport};
use super::workers::generation::GenerationPool;
use super::workers::pool::PoolStats;
use super::workers::processing::ProcessingPool;
use crate::record::{ActivityGenerator, RecordGenerator, UserRecord};

/// Two-stage generate-then-process pipeline.
///
/// # Type parameters:
/// - `G`: Record generator shared by the generation workers
/// - `H`: Unit-of-work handler shared by the processing workers
pub struct Pipeline<G = ActivityGenerator, H = SimulatedPersistence> {
    config: PipelineConfig,
    generator: Arc<G>,
    handler: Arc<H>,
}

impl Pipeline<ActivityGenerator, SimulatedPersistence> {
    /// Creates a pipeline with the stock collaborators, timed by `config`.
    ///
    /// # Errors
    /// - Returns error if the configuration is invalid (see `PipelineConfig::validate`)
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let generator = ActivityGenerator::new(config.generation_delay, config.max_log_entries);
        let handler = SimulatedPersistence::new(config.processing_delay);
        Self::with_collaborators(config, generator, handler)
    }
}

impl<G, H> Pipeline<G, H>
where
    G: RecordGenerator + 'static,
    H: UnitOfWorkHandler + 'static,
{
    /// Creates a pipeline around a custom generator and handler.
    ///
    /// When no seed is configured a random one is drawn here, so every
    /// worker of the run is seeded from the same base.
    pub fn with_collaborators(mut config: PipelineConfig, generator: G, handler: H) -> Result<Self> {
        config.validate().context("Invalid pipeline configuration")?;
        config.seed = Some(config.seed.unwrap_or_else(|| rand::rng().random()));

        Ok(Self {
            config,
            generator: Arc::new(generator),
            handler: Arc::new(handler),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs both stages to completion.
    ///
    /// Per-record failures are reported in the result; an `Err` means the run
    /// itself could not complete (spawn failure, timeout, crashed worker, or a
    /// broken exactly-once invariant).
    pub fn run(&self) -> Result<PipelineReport> {
        let started = Instant::now();
        tracing::info!(
            records = self.config.num_records,
            generation_workers = self.config.generation_pool_size(),
            processing_workers = self.config.processing_pool_size(),
            seed = self.config.seed,
            "pipeline started"
        );

        let (records, generation) = self.generate().context("Generation stage failed")?;
        let (tokens, processing) = self.process(records).context("Processing stage failed")?;

        let report = PipelineReport::new(tokens, generation, processing, started.elapsed());
        tracing::info!(
            successes = report.successes,
            failures = report.failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline finished"
        );
        Ok(report)
    }

    /// Stage one: produce the complete record set.
    fn generate(&self) -> Result<(Vec<UserRecord>, StageReport)> {
        let started = Instant::now();
        let n = self.config.num_records;

        let mut pool = GenerationPool::spawn(self.generator.clone(), &self.config)?;
        pool.submit_all(n)?;
        let records = RecordCollector::new(n).collect_from(pool.output(), self.config.timeout)?;
        let stats = pool.finish()?;
        check_exactly_once("generation", stats, n)?;

        let stage = StageReport {
            pool: stats,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            stage = "generation",
            records = records.len(),
            elapsed_ms = stage.elapsed.as_millis() as u64,
            "stage complete"
        );
        Ok((records, stage))
    }

    /// Stage two: run the handler on every record.
    fn process(&self, records: Vec<UserRecord>) -> Result<(Vec<ResultToken>, StageReport)> {
        let started = Instant::now();
        let n = records.len();

        let mut pool = ProcessingPool::spawn(self.handler.clone(), &self.config)?;
        pool.submit_all(records)?;
        let tokens = ResultCollector::new(n).collect_from(pool.output(), self.config.timeout)?;
        let stats = pool.finish()?;
        check_exactly_once("processing", stats, n)?;

        let stage = StageReport {
            pool: stats,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            stage = "processing",
            results = tokens.len(),
            elapsed_ms = stage.elapsed.as_millis() as u64,
            "stage complete"
        );
        Ok((tokens, stage))
    }
}

/// Every task must have been taken once and answered once.
fn check_exactly_once(stage: &str, stats: PoolStats, expected: usize) -> Result<()> {
    ensure!(
        stats.taken == expected && stats.emitted == expected,
        "{} pool took {} and emitted {} items, expected exactly {}",
        stage,
        stats.taken,
        stats.emitted,
        expected
    );
    Ok(())
}

#[cfg(test)]
mod driver_test {
    use super::*;
    use crate::record::IdentityGenerator;
    use std::time::Duration;

    #[test]
    fn test_invalid_config_is_rejected_before_run() {
        let config = PipelineConfig::builder().num_records(0).build();
        let result = Pipeline::with_collaborators(
            config,
            IdentityGenerator,
            SimulatedPersistence::new(Duration::ZERO),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_seed_is_fixed_at_construction() -> Result<()> {
        let config = PipelineConfig::builder().num_records(1).build();
        let pipeline = Pipeline::with_collaborators(
            config,
            IdentityGenerator,
            SimulatedPersistence::new(Duration::ZERO),
        )?;
        assert!(pipeline.config().seed.is_some());
        Ok(())
    }

    #[test]
    fn test_exactly_once_check() {
        let ok = PoolStats {
            workers: 2,
            taken: 4,
            emitted: 4,
        };
        assert!(check_exactly_once("test", ok, 4).is_ok());

        let lost = PoolStats { emitted: 3, ..ok };
        assert!(check_exactly_once("test", lost, 4).is_err());
    }
}
