//! Worker pools for the two pipeline stages.
//!
//! - `pool`: Generic fixed-size worker pool over bounded conduits
//! - `generation`: Workers turning request indices into records
//! - `processing`: Workers running the unit-of-work handler on records
//!
//! Both stages use the same lifecycle: spawn, submit the whole workload,
//! close the task conduit, collect exactly N outputs, join.

pub(crate) mod generation;
pub(crate) mod pool;
pub(crate) mod processing;

/// Stage numbers, mixed into worker RNG seeds.
pub(crate) const GENERATION_STAGE: usize = 0;
pub(crate) const PROCESSING_STAGE: usize = 1;
