//! Exponential backoff between upstream attempts.

use std::time::Duration;

/// Delay after the zero-based `attempt` failed: `base * 2^attempt`.
///
/// With a 100ms base this yields 100ms, 200ms, 400ms, ... Saturates
/// instead of overflowing for absurd attempt counts.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(0, base), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, base), Duration::from_millis(200));
        assert_eq!(backoff_delay(2, base), Duration::from_millis(400));
        assert_eq!(backoff_delay(5, base), Duration::from_millis(3200));
    }

    #[test]
    fn saturates() {
        let huge = backoff_delay(64, Duration::from_secs(u64::MAX / 2));
        assert_eq!(huge, Duration::MAX);
    }
}
