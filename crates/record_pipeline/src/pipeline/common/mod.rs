//! src/pipeline/common/mod.rs
//!
//! Utilities shared by the generation and processing pools.

pub mod thread;
