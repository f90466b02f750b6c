//! src/pipeline/handler.rs
//!
//! The unit-of-work handler and the tokens it produces.
//!
//! The processing stage treats the handler as a black box that may be slow or
//! may fail for any given record. Whatever happens, every record taken from
//! the work queue yields exactly one `ResultToken`, and failures travel inside
//! that token through the same conduit as successes.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::record::UserRecord;

/// Why a record could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessingFailure {
    /// The handler refused the record.
    #[error("record {id} rejected: {reason}")]
    Rejected { id: usize, reason: String },

    /// The backing store reported an error.
    #[error("record {id} could not be stored: {message}")]
    Storage { id: usize, message: String },

    /// The handler panicked while processing the record.
    #[error("handler panicked while processing record {id}")]
    Panicked { id: usize },
}

/// Outcome of processing one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success(String),
    Failure(ProcessingFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Result<String, ProcessingFailure>> for Outcome {
    fn from(result: Result<String, ProcessingFailure>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => write!(f, "{}", value),
            Outcome::Failure(failure) => write!(f, "FAILED: {}", failure),
        }
    }
}

/// The terminal result for one record, produced by exactly one processing
/// worker and consumed exactly once by the result collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultToken {
    /// Identifier of the processed record
    pub id: usize,
    /// Index of the processing worker that handled it
    pub worker: usize,
    pub outcome: Outcome,
}

/// Processes one record.
///
/// Implementations must return within finite time and be `Send + Sync` so that
/// one instance can be shared by every processing worker. A panic inside
/// `handle` is caught by the worker and reported as
/// `ProcessingFailure::Panicked`.
pub trait UnitOfWorkHandler: Send + Sync {
    fn handle(&self, record: &UserRecord) -> Result<String, ProcessingFailure>;
}

type FailurePredicate = Arc<dyn Fn(&UserRecord) -> bool + Send + Sync>;

/// Stand-in for persistence I/O: renders the record, waits, and reports
/// success unless the optional failure predicate matches.
#[derive(Clone)]
pub struct SimulatedPersistence {
    delay: Duration,
    fail_when: Option<FailurePredicate>,
}

impl SimulatedPersistence {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_when: None,
        }
    }

    /// Reject every record matching `predicate`.
    pub fn fail_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&UserRecord) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for SimulatedPersistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedPersistence")
            .field("delay", &self.delay)
            .field("fault_injection", &self.fail_when.is_some())
            .finish()
    }
}

impl UnitOfWorkHandler for SimulatedPersistence {
    fn handle(&self, record: &UserRecord) -> Result<String, ProcessingFailure> {
        let document = record.activity_info();

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if let Some(predicate) = &self.fail_when {
            if predicate(record) {
                return Err(ProcessingFailure::Rejected {
                    id: record.id(),
                    reason: "fault injected".to_string(),
                });
            }
        }

        Ok(format!(
            "Processed user {} ({} bytes)",
            record.id(),
            document.len()
        ))
    }
}
