//! Monotonic millisecond clock shared by every node
//!
//! All liveness timestamps are milliseconds since a process-wide epoch taken
//! the first time the clock is read. Converting back to an [`Instant`] lets
//! timers be armed at absolute deadlines computed from those timestamps.

use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds elapsed since the process epoch
pub fn monotonic_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// Absolute instant for a timestamp produced by [`monotonic_ms`]
pub fn instant_at(ms: u64) -> Instant {
    *EPOCH + Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_and_round_trips() {
        let a = monotonic_ms();
        std::thread::sleep(Duration::from_millis(5));
        let b = monotonic_ms();
        assert!(b >= a + 5);

        let at = instant_at(b);
        let now = Instant::now();
        assert!(at <= now);
        assert!(now.duration_since(at) < Duration::from_millis(50));
    }
}
