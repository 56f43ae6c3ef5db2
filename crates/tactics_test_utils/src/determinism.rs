//! Determinism testing utilities.
//!
//! Provides a harness for verifying that path queries and combat replays
//! produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and lockstep play require the tactical core to be 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Search state lives in hash maps but is never iterated; the open set
//!   orders by f-score and insertion sequence.
//!
//! - **Ambient randomness**: Damage variance, rock passability and sight
//!   blocking all draw from explicitly seeded generators.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Run is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `ticks` - Number of ticks to advance per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one tick
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::{compute_hash, verify_determinism};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || setup_volley(),
///     |state| state.tick(),
///     |state| compute_hash(&state.healths()),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(?hashes, ticks, "Determinism check failed");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the same scenario on several threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel<S, Setup, Step, HashFn>(
    threads: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S + Sync,
    Step: Fn(&mut S) + Sync,
    HashFn: Fn(&S) -> u64 + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    let mut state = setup();
                    for _ in 0..ticks {
                        step(&mut state);
                    }
                    hash(&state)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("determinism worker panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Advance two copies of a scenario tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the copies never differ, `Some(tick)` if they diverge at that
/// tick (0 means the initial states already differ).
pub fn find_first_divergence<S, Setup, Step, HashFn>(
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> Option<u64>
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut a = setup();
    let mut b = setup();

    if hash(&a) != hash(&b) {
        return Some(0);
    }

    for tick in 1..=ticks {
        step(&mut a);
        step(&mut b);

        if hash(&a) != hash(&b) {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 3, |n| compute_hash(n));
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_detects_divergence() {
        let counter = Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes(), vec![1, 2]);
    }

    #[test]
    fn test_parallel_runs_match() {
        let result = run_parallel(4, 50, || vec![1u32, 2, 3], |v| v.rotate_left(1), |v| compute_hash(v));
        assert!(result.is_deterministic);
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_find_first_divergence() {
        let seed = Cell::new(0u64);
        let first = find_first_divergence(
            5,
            || {
                seed.set(seed.get() + 1);
                (0u64, seed.get())
            },
            |(n, s)| *n += if *s == 1 { 1 } else { 2 },
            |(n, _)| *n,
        );
        assert_eq!(first, Some(1));
    }
}
