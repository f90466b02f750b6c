#![allow(dead_code)]

use record_pipeline::{
    pipeline::current_worker_id, PipelineConfig, ProcessingFailure, RecordGenerator,
    UnitOfWorkHandler, UserRecord,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Config with no simulated latency and short polling, for fast tests.
pub fn fast_config(num_records: usize, generation: usize, processing: usize) -> PipelineConfig {
    PipelineConfig::builder()
        .num_records(num_records)
        .generation_workers(generation)
        .processing_workers(processing)
        .generation_delay(Duration::ZERO)
        .processing_delay(Duration::ZERO)
        .worker_timeout(Duration::from_millis(5))
        .timeout(Duration::from_secs(10))
        .seed(42)
        .build()
}

/// Handler that records which workers took each record, optionally sleeping
/// and failing odd identifiers.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    pub takes: Arc<Mutex<HashMap<usize, Vec<usize>>>>,
    pub delay: Duration,
    pub fail_odd: bool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_odd(mut self) -> Self {
        self.fail_odd = true;
        self
    }

    pub fn takes(&self) -> HashMap<usize, Vec<usize>> {
        self.takes.lock().unwrap().clone()
    }
}

impl UnitOfWorkHandler for RecordingHandler {
    fn handle(&self, record: &UserRecord) -> Result<String, ProcessingFailure> {
        self.takes
            .lock()
            .unwrap()
            .entry(record.id())
            .or_default()
            .push(current_worker_id());

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if self.fail_odd && record.id() % 2 == 1 {
            return Err(ProcessingFailure::Rejected {
                id: record.id(),
                reason: "odd id".to_string(),
            });
        }
        Ok(format!("stored {}", record.id()))
    }
}

/// Identity generator that counts calls and notes which worker ran each one.
#[derive(Clone, Default)]
pub struct CountingGenerator {
    pub generated: Arc<AtomicUsize>,
    pub workers: Arc<Mutex<HashMap<usize, usize>>>,
    pub delay: Duration,
}

impl CountingGenerator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }
}

impl RecordGenerator for CountingGenerator {
    fn generate(&self, index: usize) -> UserRecord {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        *self
            .workers
            .lock()
            .unwrap()
            .entry(current_worker_id())
            .or_default() += 1;
        self.generated.fetch_add(1, Ordering::SeqCst);
        UserRecord::identity(index + 1)
    }
}
