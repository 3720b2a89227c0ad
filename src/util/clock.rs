//! Wall-clock helpers for queue timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
///
/// Queue ordering only needs a monotonically plausible stamp, so a clock
/// that reads before the epoch collapses to zero rather than failing.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01T00:00:00Z in milliseconds.
        assert!(now_ms() > 1_577_836_800_000);
    }
}
