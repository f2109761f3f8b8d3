//! Bounded exponential backoff for stream reconnection.

use std::time::Duration;

/// Maximum number of consecutive reconnect attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 10_000;

/// Reconnect policy: exponential backoff with a cap and a hard attempt
/// ceiling.
///
/// The ceiling is a deliberate fail-stop: once exhausted, the dashboard
/// surfaces a persistent "restart" message rather than hammering a backend
/// that may be down.
#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    attempt: u32,
}

impl ReconnectPolicy {
    /// Creates a fresh policy with zero recorded attempts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt and returns the delay to wait before it, or
    /// `None` once the attempt ceiling is exhausted.
    ///
    /// Delay for attempt `n` (1-based) is `min(1000 * 2^(n-1), 10000)`
    /// milliseconds.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= MAX_ATTEMPTS {
            return None;
        }
        self.attempt += 1;

        let factor = 2u64.saturating_pow(self.attempt - 1);
        let millis = BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS);
        Some(Duration::from_millis(millis))
    }

    /// Resets the attempt counter after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Returns the number of attempts recorded since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns whether the attempt ceiling has been reached.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.attempt >= MAX_ATTEMPTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_cap_at_ten_seconds() {
        let mut policy = ReconnectPolicy::new();
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| u64::try_from(d.as_millis()).unwrap())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000]);
    }

    #[test]
    fn no_sixth_attempt_is_scheduled() {
        let mut policy = ReconnectPolicy::new();
        for _ in 0..MAX_ATTEMPTS {
            assert!(policy.next_delay().is_some());
        }
        assert!(policy.exhausted());
        assert!(policy.next_delay().is_none());
        // Still exhausted on repeated queries.
        assert!(policy.next_delay().is_none());
    }

    #[test]
    fn reset_restores_the_full_budget() {
        let mut policy = ReconnectPolicy::new();
        while policy.next_delay().is_some() {}
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    }
}
