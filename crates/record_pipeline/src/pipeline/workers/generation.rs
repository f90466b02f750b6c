//! src/pipeline/workers/generation.rs
//!
//! Generation pool.
//!
//! Workers take request indices (0..N-1) on a first-available basis, call the
//! record generator once per index and push the record to the output conduit.
//! No worker is bound to a fixed range of indices.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;

use super::pool::{PoolOptions, PoolStats, WorkerPool};
use super::GENERATION_STAGE;
use crate::pipeline::config::PipelineConfig;
use crate::record::{RecordGenerator, UserRecord};

/// Request for one record. Consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GenerationRequest {
    pub(crate) index: usize,
}

/// Manages the workers of the generation stage.
pub(crate) struct GenerationPool {
    worker_pool: WorkerPool<GenerationRequest, UserRecord>,
}

impl GenerationPool {
    /// Spawns `config.generation_pool_size()` workers sharing `generator`.
    pub(crate) fn spawn<G>(generator: Arc<G>, config: &PipelineConfig) -> Result<Self>
    where
        G: RecordGenerator + 'static,
    {
        let options = PoolOptions {
            label: "generation-worker",
            stage: GENERATION_STAGE,
            num_workers: config.generation_pool_size(),
            capacity: config.conduit_capacity(),
            worker_timeout: config.worker_timeout,
            seed: config.seed,
        };

        let worker_pool = WorkerPool::new(options, move |worker_id, request: GenerationRequest| {
            let started = Instant::now();
            let record = generator.generate(request.index);
            tracing::info!(
                stage = "generation",
                worker = worker_id,
                id = record.id(),
                entries = record.activity().len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generated record"
            );
            record
        })
        .context("Failed to create generation pool")?;

        Ok(Self { worker_pool })
    }

    /// Enqueues one request per index in `0..count`, then closes the request
    /// conduit. All sends precede the close on this thread.
    pub(crate) fn submit_all(&mut self, count: usize) -> Result<()> {
        for index in 0..count {
            self.worker_pool
                .submit(GenerationRequest { index })
                .with_context(|| format!("Failed to submit generation request {}", index))?;
        }
        self.worker_pool.close();
        Ok(())
    }

    pub(crate) fn output(&self) -> &Receiver<UserRecord> {
        self.worker_pool.output()
    }

    /// Waits for every worker to exit.
    pub(crate) fn finish(self) -> Result<PoolStats> {
        self.worker_pool
            .join()
            .context("Generation pool did not shut down cleanly")
    }
}
