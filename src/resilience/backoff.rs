//! Linear backoff.

use std::time::Duration;

/// Delay before the attempt that follows `attempt`: `attempt * base_ms`, capped at `max_ms`.
///
/// Attempt numbers start at 1; attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(u64::from(attempt));
    Duration::from_millis(delay_ms.min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 100, 2000), Duration::from_millis(100));
        assert_eq!(calculate_backoff(2, 100, 2000), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, 100, 2000), Duration::from_millis(300));

        let max = calculate_backoff(50, 100, 1000);
        assert_eq!(max, Duration::from_millis(1000));
    }
}
