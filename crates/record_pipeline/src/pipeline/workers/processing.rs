//! src/pipeline/workers/processing.rs
//!
//! Processing pool.
//!
//! Workers take records on a first-available basis and run the unit-of-work
//! handler on each. Every record taken produces exactly one `ResultToken`:
//! handler errors and handler panics are folded into the token's outcome
//! instead of being dropped, because the result collector waits for exactly
//! N tokens.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::pool::{PoolOptions, PoolStats, WorkerPool};
use super::PROCESSING_STAGE;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::handler::{Outcome, ProcessingFailure, ResultToken, UnitOfWorkHandler};
use crate::record::UserRecord;

/// Manages the workers of the processing stage.
pub(crate) struct ProcessingPool {
    worker_pool: WorkerPool<UserRecord, ResultToken>,
}

impl ProcessingPool {
    /// Spawns `config.processing_pool_size()` workers sharing `handler`.
    pub(crate) fn spawn<H>(handler: Arc<H>, config: &PipelineConfig) -> Result<Self>
    where
        H: UnitOfWorkHandler + 'static,
    {
        let options = PoolOptions {
            label: "processing-worker",
            stage: PROCESSING_STAGE,
            num_workers: config.processing_pool_size(),
            capacity: config.conduit_capacity(),
            worker_timeout: config.worker_timeout,
            seed: config.seed,
        };

        let worker_pool = WorkerPool::new(options, move |worker_id, record: UserRecord| {
            process_record(handler.as_ref(), worker_id, &record)
        })
        .context("Failed to create processing pool")?;

        Ok(Self { worker_pool })
    }

    /// Moves every record into the work queue, then closes it.
    pub(crate) fn submit_all(&mut self, records: Vec<UserRecord>) -> Result<()> {
        for record in records {
            let id = record.id();
            self.worker_pool
                .submit(record)
                .with_context(|| format!("Failed to enqueue record {}", id))?;
        }
        self.worker_pool.close();
        Ok(())
    }

    pub(crate) fn output(&self) -> &Receiver<ResultToken> {
        self.worker_pool.output()
    }

    /// Waits for every worker to exit.
    pub(crate) fn finish(self) -> Result<PoolStats> {
        self.worker_pool
            .join()
            .context("Processing pool did not shut down cleanly")
    }
}

/// Runs the handler on one record and turns whatever happens into a token.
fn process_record<H>(handler: &H, worker_id: usize, record: &UserRecord) -> ResultToken
where
    H: UnitOfWorkHandler + ?Sized,
{
    let started = Instant::now();
    let id = record.id();

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(record))) {
        Ok(result) => Outcome::from(result),
        Err(_) => Outcome::Failure(ProcessingFailure::Panicked { id }),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        Outcome::Success(_) => tracing::info!(
            stage = "processing",
            worker = worker_id,
            id,
            elapsed_ms,
            "processed record"
        ),
        Outcome::Failure(failure) => tracing::warn!(
            stage = "processing",
            worker = worker_id,
            id,
            elapsed_ms,
            %failure,
            "record failed"
        ),
    }

    ResultToken {
        id,
        worker: worker_id,
        outcome,
    }
}
