//! Fibonacci backoff for failed reconciles.
//!
//! Grows more slowly than exponential backoff, which suits a controller that
//! talks to a rate-limited remote API: transient failures retry quickly,
//! persistent ones settle at the cap instead of drifting out to hours.
//!
//! The sequence is computed in minutes: 1m, 1m, 2m, 3m, 5m, 8m, 10m (cap).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// A backoff starting at `min_minutes` and capped at `max_minutes`.
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Returns the current backoff and advances the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_minutes * 60);
        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);
        result
    }

    /// Resets to the initial state after a successful reconcile.
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_follows_fibonacci_in_minutes() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        let seconds: Vec<u64> = (0..7).map(|_| backoff.next_backoff().as_secs()).collect();
        assert_eq!(seconds, vec![60, 60, 120, 180, 300, 480, 600]);
    }

    #[test]
    fn sequence_caps_at_max() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..7 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.next_backoff().as_secs(), 600);
        assert_eq!(backoff.next_backoff().as_secs(), 600);
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..4 {
            backoff.next_backoff();
        }
        backoff.reset();
        assert_eq!(backoff.next_backoff().as_secs(), 60);
        assert_eq!(backoff.next_backoff().as_secs(), 60);
        assert_eq!(backoff.next_backoff().as_secs(), 120);
    }
}
