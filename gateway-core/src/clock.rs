//! Process-wide monotonic millisecond clock (spec §4.A).

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

fn wall_clock_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as u64
}

/// Single source of wall-clock time for every timestamp the runtime stamps
/// onto emitted events. `now_ms()` never returns a value smaller than its
/// previous return, even across an NTP step-back, by tracking the
/// last-returned value and taking the max against the raw wall clock.
#[derive(Debug)]
pub struct Clock {
    last: Mutex<u64>,
}

impl Clock {
    pub fn new() -> Self {
        Self { last: Mutex::new(wall_clock_ms()) }
    }

    pub fn now_ms(&self) -> u64 {
        let mut last = self.last.lock();
        let raw = wall_clock_ms();
        *last = raw.max(*last);
        *last
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed/steppable clock for deterministic tests, mirroring the contract
/// every consumer of [`Clock`] actually needs (a `now_ms()` source) without
/// depending on wall-clock time.
#[derive(Debug, Default)]
pub struct TestClock {
    current_ms: Mutex<u64>,
}

impl TestClock {
    pub fn new(start_ms: u64) -> Self {
        Self { current_ms: Mutex::new(start_ms) }
    }

    pub fn now_ms(&self) -> u64 {
        *self.current_ms.lock()
    }

    pub fn advance_ms(&self, delta: u64) {
        *self.current_ms.lock() += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_never_goes_backwards() {
        let clock = Clock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
    }

    #[test]
    fn test_clock_advances_deterministically() {
        let clock = TestClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance_ms(50);
        assert_eq!(clock.now_ms(), 1_050);
    }
}
