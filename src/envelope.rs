//! Envelope and peak-hold math for the channel activity meters.
//!
//! Notes have no modeled attack: a held note sits at full level and decays
//! with a quadratic ease-out once released (percussion decays from the hit
//! itself). Peaks follow the classic VU convention of a fixed hold plateau
//! and a linear falloff until overtaken by a rising level.

use crate::ticks::{elapsed_millis, Ticks};

/// Envelope and peak timing, injected once at monitor construction.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeTuning {
    /// Milliseconds for a released note to fade to silence.
    pub decay_release_ms: f32,
    /// Milliseconds a peak indicator holds before falling.
    pub peak_hold_ms: f32,
    /// Milliseconds for a falling peak to cover the full meter range.
    pub peak_falloff_ms: f32,
}

impl Default for EnvelopeTuning {
    fn default() -> Self {
        Self {
            decay_release_ms: 350.0,
            peak_hold_ms: 1_000.0,
            peak_falloff_ms: 1_500.0,
        }
    }
}

/// Quadratic ease-out: front-loads the fade so it reads as a natural decay
/// rather than a linear ramp.
#[inline]
pub(crate) fn ease(x: f32) -> f32 {
    -((x - 1.0) * (x - 1.0)) + 1.0
}

/// Eased decay progress, `since` being the tick stamp the decay started at.
#[inline]
fn decay_envelope(now: Ticks, since: Ticks, decay_release_ms: f32) -> f32 {
    let elapsed = elapsed_millis(now, since).min(decay_release_ms);
    ease((1.0 - elapsed / decay_release_ms).max(0.0))
}

/// Envelope for a melodic channel note: full level while held, eased decay
/// after release. `on_time == 0` means the note never sounded.
pub(crate) fn melodic_envelope(
    now: Ticks,
    on_time: Ticks,
    off_time: Ticks,
    decay_release_ms: f32,
) -> f32 {
    if on_time == 0 {
        return 0.0;
    }

    // Guard against queries stamped before the note event (counter wrap,
    // out-of-order refresh) underflowing into a huge elapsed time.
    let now = now.max(on_time);

    if off_time == 0 {
        // Held: instant-attack plateau.
        1.0
    } else {
        decay_envelope(now, off_time, decay_release_ms)
    }
}

/// Envelope for the percussion channel: drum hits are transient, so decay
/// starts at the hit regardless of any note-off.
pub(crate) fn percussion_envelope(now: Ticks, on_time: Ticks, decay_release_ms: f32) -> f32 {
    if on_time == 0 {
        return 0.0;
    }

    let now = now.max(on_time);
    decay_envelope(now, on_time, decay_release_ms)
}

/// Per-channel peak indicator: hold plateau, then linear falloff, re-armed
/// whenever the live level meets or exceeds it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PeakState {
    level: f32,
    time: Ticks,
}

impl PeakState {
    /// Advance the peak for one level query and return the value to display.
    ///
    /// The falloff is derived from time-since-rise on every call rather than
    /// accumulated into storage, so the ramp stays linear however often the
    /// display polls; storage changes only when the peak is re-armed.
    pub(crate) fn advance(&mut self, now: Ticks, level: f32, tuning: &EnvelopeTuning) -> f32 {
        let held_millis = elapsed_millis(now, self.time);
        let mut peak = self.level;

        if held_millis >= tuning.peak_hold_ms {
            let fall_millis = (held_millis - tuning.peak_hold_ms).max(0.0);
            peak = (peak - fall_millis / tuning.peak_falloff_ms).clamp(0.0, 1.0);
        }

        if level >= peak {
            peak = level;
            self.level = level;
            self.time = now;
        }

        peak
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
