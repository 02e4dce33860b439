/*
 *  ticks.rs
 *
 *  MidiVu - MIDI channel activity meters
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::time::Instant;

/// Free-running, wrapping monotonic time unit. One tick is one microsecond;
/// the counter wraps a little over every 71 minutes.
pub type Ticks = u32;

pub const TICKS_PER_MILLI: u32 = 1_000;

/// Elapsed milliseconds between two tick stamps. Wrap-safe: the unsigned
/// difference is correct across a single counter wrap.
#[inline]
pub fn elapsed_millis(now: Ticks, then: Ticks) -> f32 {
    now.wrapping_sub(then) as f32 / TICKS_PER_MILLI as f32
}

#[inline]
pub fn millis_to_ticks(millis: u32) -> Ticks {
    millis.wrapping_mul(TICKS_PER_MILLI)
}

/// Process-wide tick source. Derives the wrapping counter from a monotonic
/// `Instant`, so two clones read the same timeline.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    epoch: Instant,
}

impl TickClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Current tick stamp, truncated to the wrapping counter width.
    /// 0 carries "never" meaning in the note tables, so the clock skips it.
    #[inline]
    pub fn now(&self) -> Ticks {
        let ticks = (self.epoch.elapsed().as_micros() & u32::MAX as u128) as u32;
        // Keep 0 reserved for "never happened".
        ticks.max(1)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_wrap_safe() {
        // `then` stamped just before the counter wrapped, `now` just after.
        let then: Ticks = u32::MAX - 500;
        let now: Ticks = 1_500;
        assert_eq!(elapsed_millis(now, then), 2_001.0 / 1_000.0);
    }

    #[test]
    fn test_millis_round_trip() {
        assert_eq!(millis_to_ticks(3_000), 3_000_000);
        assert_eq!(elapsed_millis(millis_to_ticks(250), 0), 250.0);
    }

    #[test]
    fn test_clock_never_reports_zero() {
        let clock = TickClock::new();
        assert!(clock.now() >= 1);
    }

    #[test]
    fn test_clock_is_monotonic_within_wrap() {
        let clock = TickClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b.wrapping_sub(a) < u32::MAX / 2);
    }
}
