// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logical clock driving buffer aging.
//!
//! No wall-clock dependency: the surrounding stack calls
//! [`AgingClock::advance`] from its periodic main function, and all age
//! computations use wrapping subtraction so the counter may roll over.

/// Logical time in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tick(pub u32);

impl Tick {
    /// Ticks elapsed since `earlier` (wrapping).
    pub fn age_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// True if more than `timeout` ticks have passed since `stamp`.
    pub fn is_expired(self, stamp: Tick, timeout: u32) -> bool {
        self.age_since(stamp) > timeout
    }

    /// The tick `n` steps later (wrapping).
    pub fn after(self, n: u32) -> Tick {
        Tick(self.0.wrapping_add(n))
    }
}

/// Monotonic tick counter.
#[derive(Debug, Default)]
pub struct AgingClock {
    tick: Tick,
}

impl AgingClock {
    /// Clock starting at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.tick
    }

    /// Advance by one tick.
    pub fn advance(&mut self) -> Tick {
        self.tick = self.tick.after(1);
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut clock = AgingClock::new();
        assert_eq!(clock.now(), Tick(0));
        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), Tick(2));
    }

    #[test]
    fn test_expiry_is_strictly_greater() {
        let stamp = Tick(100);
        assert!(!Tick(150).is_expired(stamp, 50));
        assert!(Tick(151).is_expired(stamp, 50));
    }

    #[test]
    fn test_age_across_wraparound() {
        let stamp = Tick(u32::MAX - 2);
        let now = stamp.after(5);
        assert_eq!(now, Tick(2));
        assert_eq!(now.age_since(stamp), 5);
        assert!(!now.is_expired(stamp, 5));
        assert!(now.is_expired(stamp, 4));
    }
}
