/*
 *  pacer.rs
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

use std::time::{Duration, Instant};

/// Fixed-rate frame scheduler for the render loop. Deadlines advance on a
/// fixed grid so a slow frame borrows from the next one instead of
/// stretching the whole timeline.
pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        let frame = Duration::from_micros(1_000_000u64 / target_fps.max(1) as u64);
        Self { next_deadline: Instant::now() + frame, frame }
    }

    #[inline]
    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Time to sleep before the next frame is due; zero when overdue.
    /// Schedules the following deadline as a side effect.
    #[inline]
    pub fn until_next_frame(&mut self) -> Duration {
        let now = Instant::now();
        let wait = self.next_deadline.saturating_duration_since(now);
        self.next_deadline = if wait.is_zero() {
            // Overdue: restart the grid from now rather than racing to
            // catch up with a burst of back-to-back frames.
            now + self.frame
        } else {
            self.next_deadline + self.frame
        };
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        let pacer = Pacer::new(25);
        assert_eq!(pacer.frame_duration(), Duration::from_millis(40));
    }

    #[test]
    fn test_zero_fps_clamped() {
        let pacer = Pacer::new(0);
        assert_eq!(pacer.frame_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_wait_is_bounded_by_frame() {
        let mut pacer = Pacer::new(50);
        let wait = pacer.until_next_frame();
        assert!(wait <= Duration::from_millis(20));
    }

    #[test]
    fn test_overdue_frame_waits_zero() {
        let mut pacer = Pacer::new(1_000);
        std::thread::sleep(Duration::from_millis(5));
        assert!(pacer.until_next_frame().is_zero());
    }
}
