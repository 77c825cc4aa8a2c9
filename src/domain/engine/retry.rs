//! Exponential backoff between passes over the provider list.

use std::time::Duration;

/// Upper bound on any single backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Deterministic exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    #[must_use]
    pub fn from_millis(base_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms))
    }

    /// Delay after the failed pass `attempt` (0-indexed): `base * 2^attempt`,
    /// capped at one minute.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delays_double_each_attempt() {
        let policy = BackoffPolicy::from_millis(1_000);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4_000));
    }

    #[test]
    fn delays_are_capped() {
        let policy = BackoffPolicy::from_millis(1_000);
        assert_eq!(policy.delay_for_attempt(10), MAX_BACKOFF);
        assert_eq!(policy.delay_for_attempt(40), MAX_BACKOFF);
    }

    #[test]
    fn zero_base_never_waits() {
        let policy = BackoffPolicy::from_millis(0);
        assert_eq!(policy.delay_for_attempt(5), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn delays_never_decrease(base_ms in 0u64..10_000, attempt in 0u32..64) {
            let policy = BackoffPolicy::from_millis(base_ms);
            prop_assert!(policy.delay_for_attempt(attempt + 1) >= policy.delay_for_attempt(attempt));
            prop_assert!(policy.delay_for_attempt(attempt) <= MAX_BACKOFF);
        }
    }
}
