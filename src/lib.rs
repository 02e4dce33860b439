/*
 *  lib.rs
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

//! MIDI channel activity metering for small monochrome displays.
//!
//! The core is [`monitor::MidiMonitor`]: feed it raw MIDI short messages and
//! query per-channel loudness levels and peak-hold values on every display
//! refresh. Around it sit the bar-meter widget, a transient-message overlay,
//! and the input/output plumbing the daemon binary wires together.

pub mod config;
pub mod envelope;
pub mod input;
pub mod meters;
pub mod monitor;
pub mod pacer;
pub mod sink;
pub mod ticks;
pub mod ui;
pub mod vframebuf;

pub use envelope::EnvelopeTuning;
pub use monitor::{MidiMonitor, CHANNEL_COUNT, NOTE_COUNT, PERCUSSION_CHANNEL};
pub use ticks::{TickClock, Ticks};
