//! src/pipeline/mod.rs
//!
//! This module implements the two-stage record `Pipeline`.
//!
//! A fixed-size generation pool synthesizes N records, the driver waits until
//! all N are collected, then a fixed-size processing pool runs the
//! unit-of-work handler once per record and the driver collects N result
//! tokens.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │  PipelineConfig  │ (N, pool sizes, delays, timeouts)
//!                    └────────┬─────────┘
//!                             ↓
//!                    ┌──────────────────┐
//!                    │     Pipeline     │ (driver: owns conduits and pools)
//!                    └────────┬─────────┘
//!                             │ request indices 0..N-1
//!                             ↓
//!                  [Generation Workers] ── RecordGenerator
//!                             │ UserRecord
//!                             ↓
//!                    ┌──────────────────┐
//!                    │ RecordCollector  │ (barrier: exactly N records)
//!                    └────────┬─────────┘
//!                             │ UserRecord
//!                             ↓
//!                  [Processing Workers] ── UnitOfWorkHandler
//!                             │ ResultToken (success | failure)
//!                             ↓
//!                    ┌──────────────────┐
//!                    │ ResultCollector  │ (exactly N tokens)
//!                    └────────┬─────────┘
//!                             ↓
//!                    ┌──────────────────┐
//!                    │  PipelineReport  │
//!                    └──────────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/pipeline/
//! ├── mod.rs             # Public API exports + architecture docs
//! ├── config.rs          # PipelineConfig, builder, and validation
//! ├── driver.rs          # Pipeline struct: stage sequencing
//! ├── collector.rs       # RecordCollector and ResultCollector
//! ├── handler.rs         # UnitOfWorkHandler, ResultToken, ProcessingFailure
//! ├── report.rs          # PipelineReport and its renderings
//! ├── workers/
//! │   ├── mod.rs         # Stage constants
//! │   ├── pool.rs        # Generic `WorkerPool<Task, Output>` implementation
//! │   ├── generation.rs  # GenerationPool
//! │   └── processing.rs  # ProcessingPool
//! └── common/
//!     ├── mod.rs
//!     └── thread.rs      # Thread-local worker ID and RNG
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .num_records(10)
//!     .generation_workers(3)
//!     .processing_workers(5)
//!     .build();
//!
//! let report = Pipeline::new(config)?.run()?;
//! assert_eq!(report.records, 10);
//! ```
//!
//! # Guarantees
//! - Every request index and every record is taken by exactly one worker.
//! - Every record taken yields exactly one `ResultToken`, including when the
//!   handler fails or panics.
//! - No ordering is promised between records, results or diagnostics.
//! - Stage two starts only after all N records of stage one are collected.

pub mod collector;
pub mod common;
mod config;
mod driver;
pub mod handler;
mod report;
mod workers;

pub use collector::{RecordCollector, ResultCollector};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use driver::Pipeline;
pub use handler::{
    Outcome, ProcessingFailure, ResultToken, SimulatedPersistence, UnitOfWorkHandler,
};
pub use report::{ItemReport, PipelineReport, StageReport};
pub use workers::pool::PoolStats;

pub use common::thread::{
    current_worker_id, init_worker_rng, worker_gen_range, WORKER_ID, WORKER_RNG,
};
