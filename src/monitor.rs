/*
 *  monitor.rs
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

//! Per-channel MIDI activity tracking.
//!
//! `MidiMonitor` consumes raw channel-voice short messages and, on demand,
//! synthesizes a normalized loudness level and a peak-hold value for each of
//! the 16 channels. Two method groups share one fixed-size state arena: the
//! decoder group is fed from the MIDI input path, the level query from the
//! display refresh path. Nothing here allocates after construction.

use log::debug;

use crate::envelope::{
    melodic_envelope, percussion_envelope, EnvelopeTuning, PeakState,
};
use crate::ticks::Ticks;

pub const CHANNEL_COUNT: usize = 16;
pub const NOTE_COUNT: usize = 128;

/// GM fixes percussion on channel 10 (0-indexed 9). Remappable drum
/// channels are not modeled.
pub const PERCUSSION_CHANNEL: usize = 9;

const DEFAULT_VOLUME: u8 = 100;
const DEFAULT_PAN: u8 = 64;
const DEFAULT_EXPRESSION: u8 = 127;

// Controller numbers the decoder acts on.
const CC_VOLUME: u8 = 0x07;
const CC_PAN: u8 = 0x0A;
const CC_EXPRESSION: u8 = 0x0B;
const CC_ALL_SOUND_OFF: u8 = 0x78;
const CC_RESET_ALL_CONTROLLERS: u8 = 0x79;
const CC_ALL_NOTES_OFF: u8 = 0x7B;
const CC_OMNI_OFF: u8 = 0x7C;
const CC_OMNI_ON: u8 = 0x7D;
const CC_MONO_ON: u8 = 0x7E;
const CC_MONO_OFF: u8 = 0x7F;

/// One note slot. A tick stamp of 0 means "never" (no trigger / no release
/// yet); `on_time` is kept across release so the envelope can shape the tail.
#[derive(Debug, Clone, Copy, Default)]
struct NoteState {
    on_time: Ticks,
    off_time: Ticks,
    velocity: u8,
}

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    volume: u8,
    pan: u8,
    expression: u8,
    notes: [NoteState; NOTE_COUNT],
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            pan: DEFAULT_PAN,
            expression: DEFAULT_EXPRESSION,
            notes: [NoteState::default(); NOTE_COUNT],
        }
    }
}

pub struct MidiMonitor {
    tuning: EnvelopeTuning,
    channels: [ChannelState; CHANNEL_COUNT],
    peaks: [PeakState; CHANNEL_COUNT],
}

impl MidiMonitor {
    /// Construct with all notes silent and controllers at their power-on
    /// defaults, via the same routines a System Reset runs.
    pub fn new(tuning: EnvelopeTuning) -> Self {
        let mut monitor = Self {
            tuning,
            channels: [ChannelState::default(); CHANNEL_COUNT],
            peaks: [PeakState::default(); CHANNEL_COUNT],
        };
        monitor.all_notes_off();
        monitor.reset_controllers(false);
        monitor
    }

    /// Decode one channel-voice short message stamped `now`.
    ///
    /// `data1`/`data2` are expected pre-validated 7-bit values (the upstream
    /// parser's job); the note index is masked so a bad byte can at worst
    /// touch the wrong slot, never the wrong memory. Unhandled statuses and
    /// controllers fall through as no-ops.
    pub fn handle_short_message(&mut self, status: u8, data1: u8, data2: u8, now: Ticks) {
        // System Reset carries no channel nibble; test it before masking.
        if status == 0xFF {
            debug!("MIDI system reset");
            self.all_notes_off();
            self.reset_controllers(false);
            return;
        }

        let channel = (status & 0x0F) as usize;
        let note = (data1 & 0x7F) as usize;

        match status & 0xF0 {
            // Note off: stamp the release, keep on-time and velocity so the
            // decay tail has its history.
            0x80 => {
                self.channels[channel].notes[note].off_time = now;
            }

            // Note on. Velocity 0 is a release by MIDI convention; anything
            // else (re)triggers the envelope from full level.
            0x90 => {
                let slot = &mut self.channels[channel].notes[note];
                if data2 != 0 {
                    slot.on_time = now;
                    slot.off_time = 0;
                    slot.velocity = data2;
                } else {
                    slot.off_time = now;
                }
            }

            0xB0 => self.process_cc(channel, data1, data2),

            _ => {}
        }
    }

    /// Current per-channel levels and peak-hold values, both in [0,1].
    ///
    /// Pure in the note/controller state; the only mutation is advancing the
    /// stored peaks. A channel's level tracks its loudest concurrent voice
    /// (max, not sum — a true mix is not recoverable from MIDI).
    pub fn channel_levels(
        &mut self,
        now: Ticks,
    ) -> ([f32; CHANNEL_COUNT], [f32; CHANNEL_COUNT]) {
        let mut levels = [0.0f32; CHANNEL_COUNT];
        let mut peaks = [0.0f32; CHANNEL_COUNT];

        for channel in 0..CHANNEL_COUNT {
            let state = &self.channels[channel];
            let is_percussion = channel == PERCUSSION_CHANNEL;
            let mut level = 0.0f32;

            for note in &state.notes {
                let env = if is_percussion {
                    percussion_envelope(now, note.on_time, self.tuning.decay_release_ms)
                } else {
                    melodic_envelope(
                        now,
                        note.on_time,
                        note.off_time,
                        self.tuning.decay_release_ms,
                    )
                };
                let voice = env
                    * (note.velocity as f32 / 127.0)
                    * (state.volume as f32 / 127.0)
                    * (state.expression as f32 / 127.0);
                level = level.max(voice);
            }

            let level = level.clamp(0.0, 1.0);
            levels[channel] = level;
            peaks[channel] = self.peaks[channel].advance(now, level, &self.tuning);
        }

        (levels, peaks)
    }

    /// Silence every note slot on every channel.
    pub fn all_notes_off(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.notes = [NoteState::default(); NOTE_COUNT];
        }
    }

    /// Reset controllers on every channel. The MIDI spec carves volume and
    /// pan out of Reset All Controllers; only a full reset touches them.
    pub fn reset_controllers(&mut self, is_reset_all_controllers: bool) {
        for channel in self.channels.iter_mut() {
            channel.expression = DEFAULT_EXPRESSION;

            if !is_reset_all_controllers {
                channel.volume = DEFAULT_VOLUME;
                channel.pan = DEFAULT_PAN;
            }
        }
    }

    /// Reset peaks too; used by callers that restart metering wholesale.
    pub fn reset(&mut self) {
        self.all_notes_off();
        self.reset_controllers(false);
        for peak in self.peaks.iter_mut() {
            peak.reset();
        }
    }

    fn process_cc(&mut self, channel: usize, controller: u8, value: u8) {
        match controller {
            CC_VOLUME => self.channels[channel].volume = value,
            CC_PAN => self.channels[channel].pan = value,
            CC_EXPRESSION => self.channels[channel].expression = value,

            // Every channel-mode message implies All Notes Off at a receiver.
            // Applied across all channels, matching common synth behavior.
            CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF | CC_OMNI_OFF | CC_OMNI_ON | CC_MONO_ON
            | CC_MONO_OFF => {
                debug!("all notes off (cc {:#04x} on channel {})", controller, channel);
                self.all_notes_off();
            }

            CC_RESET_ALL_CONTROLLERS => self.reset_controllers(true),

            _ => {}
        }
    }

    #[cfg(test)]
    fn channel_controllers(&self, channel: usize) -> (u8, u8, u8) {
        let state = &self.channels[channel];
        (state.volume, state.pan, state.expression)
    }
}

impl Default for MidiMonitor {
    fn default() -> Self {
        Self::new(EnvelopeTuning::default())
    }
}
