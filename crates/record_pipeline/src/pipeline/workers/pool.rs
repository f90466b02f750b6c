//! Worker pool shared by both pipeline stages.
//!
//! Provides a fixed-size set of threads that pull tasks from one shared
//! conduit and push one output per task into a second conduit.
//!
//! # Key features
//! - Both conduits are bounded; capacity is chosen by the caller
//! - First-available distribution: idle workers race on the shared receiver,
//!   and the channel hands each task to exactly one of them
//! - A single owner closes the task conduit, exactly once
//! - Take/emit counters for checking the one-output-per-task invariant
//! - Shutdown on drop that never waits on a worker stuck inside a task
//!
//! # Worker exit conditions
//! A worker leaves its take-loop when the task conduit is closed and drained,
//! when the shutdown flag is raised, or when the output conduit has no
//! receiver left.

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::pipeline::common::thread::{init_worker_rng, WORKER_ID};

/// Parameters shared by every worker of a pool.
#[derive(Debug, Clone)]
pub(crate) struct PoolOptions {
    /// Thread name prefix, e.g. `generation-worker`
    pub(crate) label: &'static str,
    /// Stage number mixed into worker RNG seeds
    pub(crate) stage: usize,
    pub(crate) num_workers: usize,
    /// Capacity of both the task and the output conduit
    pub(crate) capacity: usize,
    /// How often an idle worker re-checks the shutdown flag
    pub(crate) worker_timeout: Duration,
    pub(crate) seed: Option<u64>,
}

/// Counts of tasks taken from the task conduit and outputs pushed to the
/// output conduit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub taken: usize,
    pub emitted: usize,
}

#[derive(Default)]
struct PoolCounters {
    taken: AtomicUsize,
    emitted: AtomicUsize,
}

/// Thread pool for one pipeline stage.
///
/// Manages worker lifecycle and communication through bounded channels:
/// - Task channel: Driver -> Workers (work distribution)
/// - Output channel: Workers -> Driver (result collection)
/// - Shutdown flag: Enables graceful termination
///
/// # Type Parameters
/// - `Task`: Work items sent to workers
/// - `Output`: Results returned from workers
pub(crate) struct WorkerPool<Task, Output> {
    workers: Vec<thread::JoinHandle<()>>,
    task_tx: Option<Sender<Task>>,
    output_rx: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<PoolCounters>,
    num_workers: usize,
    worker_timeout: Duration,
}

impl<Task, Output> WorkerPool<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    /// Spawns `options.num_workers` threads, each running a take-loop that
    /// calls `worker_fn(worker_id, task)` once per task taken.
    pub(crate) fn new<F>(options: PoolOptions, worker_fn: F) -> Result<Self>
    where
        F: Fn(usize, Task) -> Output + Send + Sync + 'static,
    {
        if options.num_workers == 0 {
            return Err(anyhow!(
                "Cannot create a {} pool with 0 workers",
                options.label
            ));
        }

        if options.capacity == 0 {
            return Err(anyhow!(
                "Cannot create a {} pool with capacity 0. \
                Capacity must cover the whole workload.",
                options.label
            ));
        }

        let (task_tx, task_rx) = bounded::<Task>(options.capacity);
        let (output_tx, output_rx) = bounded::<Output>(options.capacity);

        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(PoolCounters::default());
        let worker_fn = Arc::new(worker_fn);
        let mut workers = Vec::with_capacity(options.num_workers);

        for worker_id in 0..options.num_workers {
            let task_rx = task_rx.clone();
            let output_tx = output_tx.clone();
            let worker_shutdown = shutdown.clone();
            let worker_counters = counters.clone();
            let worker_fn = worker_fn.clone();
            let worker_timeout = options.worker_timeout;
            let seed = options.seed;
            let stage = options.stage;

            let handle = thread::Builder::new()
                .name(format!("{}-{}", options.label, worker_id))
                .spawn(move || {
                    WORKER_ID.with(|id| *id.borrow_mut() = worker_id);
                    if let Some(base_seed) = seed {
                        init_worker_rng(worker_id, stage, base_seed);
                    }

                    while !worker_shutdown.load(Ordering::Relaxed) {
                        match task_rx.recv_timeout(worker_timeout) {
                            Ok(task) => {
                                worker_counters.taken.fetch_add(1, Ordering::SeqCst);
                                let output = worker_fn(worker_id, task);
                                if output_tx.send(output).is_err() {
                                    break;
                                }
                                worker_counters.emitted.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })
                .with_context(|| {
                    format!("Failed to spawn {} thread {}", options.label, worker_id)
                });

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Dropping the partial pool releases the workers that did start.
                    drop(Self {
                        workers,
                        task_tx: Some(task_tx),
                        output_rx,
                        shutdown,
                        counters,
                        num_workers: options.num_workers,
                        worker_timeout: options.worker_timeout,
                    });
                    return Err(e);
                }
            }
        }

        Ok(Self {
            workers,
            task_tx: Some(task_tx),
            output_rx,
            shutdown,
            counters,
            num_workers: options.num_workers,
            worker_timeout: options.worker_timeout,
        })
    }

    /// Enqueues one task without blocking.
    ///
    /// Conduits are sized to the workload, so a full conduit means the caller
    /// submitted more tasks than it declared and is reported as an error.
    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        let task_tx = self
            .task_tx
            .as_ref()
            .ok_or_else(|| anyhow!("Task conduit already closed"))?;

        match task_tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(anyhow!(
                "Task conduit at capacity ({} tasks) - more tasks submitted than declared",
                task_tx.capacity().unwrap_or_default()
            )),
            Err(TrySendError::Disconnected(_)) => {
                Err(anyhow!("Task conduit disconnected - all workers have exited"))
            }
        }
    }

    /// Marks the task conduit closed. Workers drain what is left and exit.
    ///
    /// The pool holds the only sender, so the conduit closes exactly once no
    /// matter how often this is called.
    pub(crate) fn close(&mut self) {
        self.task_tx.take();
    }

    pub(crate) fn output(&self) -> &Receiver<Output> {
        &self.output_rx
    }

    /// Closes the task conduit, waits for every worker to exit and returns
    /// the pool's counters.
    pub(crate) fn join(mut self) -> Result<PoolStats> {
        self.close();

        let mut panicked = 0;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            bail!("{} of {} workers panicked", panicked, self.num_workers);
        }

        Ok(self.stats())
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.num_workers,
            taken: self.counters.taken.load(Ordering::SeqCst),
            emitted: self.counters.emitted.load(Ordering::SeqCst),
        }
    }
}

impl<Task, Output> Drop for WorkerPool<Task, Output> {
    fn drop(&mut self) {
        // Signal shutdown to all workers
        self.shutdown.store(true, Ordering::Relaxed);

        // Drop the task sender to close the conduit
        self.task_tx.take();

        // Idle workers see the flag within one polling interval. A worker
        // still inside a task may never return, so it is detached instead.
        let deadline = Instant::now() + self.worker_timeout * 2;
        while Instant::now() < deadline && self.workers.iter().any(|w| !w.is_finished()) {
            thread::sleep(Duration::from_millis(1));
        }

        for worker in self.workers.drain(..) {
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                tracing::warn!(
                    thread = worker.thread().name().unwrap_or("worker"),
                    "detaching worker still inside a task"
                );
            }
        }
    }
}
