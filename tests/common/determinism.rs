//! Deterministic run ids
//!
//! Recorded behaviors are keyed by run id, so tests that record and then
//! replay need ids they can reproduce.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates sequential run ids (`run-0001`, `run-0002`, ...)
///
/// # Example
/// ```
/// let ids = DeterministicRunIds::new();
/// assert_eq!(ids.next(), "run-0001");
/// assert_eq!(ids.next(), "run-0002");
/// ```
pub struct DeterministicRunIds {
    counter: AtomicU64,
}

impl DeterministicRunIds {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next run id
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("run-{n:04}")
    }

    /// Reset the generator to its initial state
    pub fn reset(&self) {
        self.counter.store(1, Ordering::SeqCst);
    }
}

impl Default for DeterministicRunIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_sequential_and_resettable() {
        let ids = DeterministicRunIds::new();
        assert_eq!(ids.next(), "run-0001");
        assert_eq!(ids.next(), "run-0002");
        ids.reset();
        assert_eq!(ids.next(), "run-0001");
    }
}
