//! # Exponential Backoff
//!
//! Per-resource retry delays for transient Kubernetes API failures
//! (conflicts, throttling, unavailable API server).
//!
//! The delay doubles on every consecutive failure and is capped. A successful
//! pass resets it.
//!
//! ## Usage
//!
//! ```rust
//! use backplane_operator::controller::backoff::ExponentialBackoff;
//!
//! let mut backoff = ExponentialBackoff::new(2, 60);
//! assert_eq!(backoff.next_backoff_seconds(), 2);
//! assert_eq!(backoff.next_backoff_seconds(), 4);
//! assert_eq!(backoff.next_backoff_seconds(), 8);
//! ```

use std::time::Duration;

/// Exponential backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Floor, used for the first retry and after reset
    min_seconds: u64,
    /// Delay returned by the next call
    current_seconds: u64,
    /// Ceiling
    max_seconds: u64,
}

impl ExponentialBackoff {
    /// Create a backoff that starts at `min_seconds` and never exceeds `max_seconds`
    ///
    /// A zero floor is raised to one second so the sequence can grow.
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        let min_seconds = min_seconds.max(1);
        let max_seconds = max_seconds.max(min_seconds);
        Self {
            min_seconds,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_seconds;
        self.current_seconds = self
            .current_seconds
            .saturating_mul(2)
            .min(self.max_seconds);
        result
    }

    /// Get the next backoff as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_seconds = self.min_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_sequence_is_capped() {
        let mut backoff = ExponentialBackoff::new(2, 20);
        let sequence: Vec<u64> = (0..6).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(sequence, vec![2, 4, 8, 16, 20, 20]);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = ExponentialBackoff::new(1, 300);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.reset();
        assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut backoff = ExponentialBackoff::new(0, 0);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }

    #[test]
    fn test_independent_state_per_instance() {
        let mut first = ExponentialBackoff::new(1, 60);
        let mut second = ExponentialBackoff::new(1, 60);
        first.next_backoff_seconds();
        first.next_backoff_seconds();
        assert_eq!(first.next_backoff_seconds(), 4);
        assert_eq!(second.next_backoff_seconds(), 1);
    }
}
