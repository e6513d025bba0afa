//! Monotonic millisecond clock.

use std::time::{Duration, Instant};

/// Milliseconds elapsed since construction.
///
/// Protocol timers compare `u64` millisecond stamps; the origin is arbitrary
/// and only differences are meaningful.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Current reading.
    pub fn now_ms(&self) -> u64 {
        duration_ms(self.origin.elapsed())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn duration_conversion() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::from_micros(999)), 0);
    }
}
