//! Thread-local state for pipeline workers.
//!
//! Every pool worker records its index in `WORKER_ID` when it starts, and
//! optionally seeds a private RNG so that collaborators drawing randomness
//! through `worker_gen_range` get reproducible streams per worker.

use rand::rngs::StdRng;
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;
use std::ops::Range;

thread_local! {
    /// Thread-local worker ID.
    ///
    /// Each worker thread is assigned an ID (0 to pool_size-1) when spawned.
    /// Outside a pool this stays 0.
    pub static WORKER_ID: RefCell<usize> = const { RefCell::new(0) };

    /// Thread-local RNG for deterministic randomness in workers
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Initialize a worker's RNG from its id, its stage and the run's base seed.
/// Seed formula: base_seed + (stage << 32) + worker_id
pub fn init_worker_rng(worker_id: usize, stage: usize, base_seed: u64) {
    WORKER_RNG.with(|rng| {
        let seed = base_seed
            .wrapping_add((stage as u64) << 32)
            .wrapping_add(worker_id as u64);
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Returns the ID of the pool worker running on this thread.
pub fn current_worker_id() -> usize {
    WORKER_ID.with(|id| *id.borrow())
}

/// Draw a value from `range` using the worker RNG, or the thread RNG if this
/// thread was never seeded. An empty range yields its start.
pub fn worker_gen_range(range: Range<usize>) -> usize {
    if range.is_empty() {
        return range.start;
    }
    WORKER_RNG.with(|rng| {
        let mut rng_ref = rng.borrow_mut();
        match rng_ref.as_mut() {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    })
}

#[cfg(test)]
mod thread_test {
    use super::*;

    #[test]
    fn test_seeded_workers_are_reproducible() {
        init_worker_rng(3, 1, 42);
        let first: Vec<usize> = (0..16).map(|_| worker_gen_range(0..1000)).collect();

        init_worker_rng(3, 1, 42);
        let second: Vec<usize> = (0..16).map(|_| worker_gen_range(0..1000)).collect();
        assert_eq!(first, second);

        init_worker_rng(4, 1, 42);
        let other: Vec<usize> = (0..16).map(|_| worker_gen_range(0..1000)).collect();
        assert_ne!(first, other);
    }

    #[test]
    fn test_empty_range_returns_start() {
        assert_eq!(worker_gen_range(7..7), 7);
    }
}
