/*
 *  input.rs
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

//! MIDI input plumbing: enumerate ports, connect, and forward validated
//! short messages into the shared monitor with a tick stamp captured at
//! arrival. SysEx and running status never reach the monitor — midir
//! delivers complete, status-first messages.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use midir::{MidiInput, MidiInputConnection};
use thiserror::Error;

use crate::monitor::MidiMonitor;
use crate::ticks::TickClock;

const CLIENT_NAME: &str = "MidiVu";

#[derive(Debug, Error)]
pub enum MidiSourceError {
    #[error("failed to initialize MIDI input: {0}")]
    Init(#[from] midir::InitError),
    #[error("failed to connect to MIDI port: {0}")]
    Connect(String),
    #[error("no MIDI input port matching \"{0}\"")]
    PortNotFound(String),
    #[error("no MIDI input ports available")]
    NoPorts,
}

/// An open MIDI input feeding the monitor. Dropping it closes the port.
pub struct MidiSource {
    // Held for its Drop; the callback lives inside.
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiSource {
    /// Names of all MIDI input ports currently visible.
    pub fn port_names() -> Result<Vec<String>, MidiSourceError> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let names = midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect();
        Ok(names)
    }

    /// Connect to the first port whose name contains `filter` (any port when
    /// `filter` is None) and start feeding `monitor`.
    pub fn connect(
        filter: Option<&str>,
        monitor: Arc<Mutex<MidiMonitor>>,
        clock: TickClock,
    ) -> Result<Self, MidiSourceError> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(MidiSourceError::NoPorts);
        }

        let port = match filter {
            Some(wanted) => ports
                .iter()
                .find(|port| {
                    midi_in
                        .port_name(port)
                        .map(|name| name.contains(wanted))
                        .unwrap_or(false)
                })
                .ok_or_else(|| MidiSourceError::PortNotFound(wanted.to_string()))?,
            None => &ports[0],
        };

        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "unknown".to_string());

        let connection = midi_in
            .connect(
                port,
                "midivu-input",
                move |_stamp, message, _| {
                    forward_message(message, &monitor, &clock);
                },
                (),
            )
            .map_err(|err| MidiSourceError::Connect(err.to_string()))?;

        info!("MIDI input connected: {}", port_name);
        Ok(Self { _connection: connection, port_name })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Validate and forward one incoming message, stamped on arrival.
fn forward_message(message: &[u8], monitor: &Arc<Mutex<MidiMonitor>>, clock: &TickClock) {
    let Some(&status) = message.first() else {
        return;
    };
    let now = clock.now();

    // System Reset is the only status-only message the monitor decodes;
    // channel-voice messages need both data bytes.
    let (data1, data2) = if status == 0xFF {
        (0, 0)
    } else if message.len() >= 3 {
        (message[1], message[2])
    } else {
        debug!("ignoring short MIDI message: {:02x?}", message);
        return;
    };

    match monitor.lock() {
        Ok(mut monitor) => monitor.handle_short_message(status, data1, data2, now),
        // A poisoned lock means the render loop panicked; nothing useful
        // left to feed.
        Err(_) => warn!("monitor lock poisoned; dropping MIDI message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeTuning;
    use crate::monitor::CHANNEL_COUNT;

    fn shared_monitor() -> Arc<Mutex<MidiMonitor>> {
        Arc::new(Mutex::new(MidiMonitor::new(EnvelopeTuning::default())))
    }

    #[test]
    fn test_forward_note_on() {
        let monitor = shared_monitor();
        let clock = TickClock::new();

        forward_message(&[0x90, 60, 100], &monitor, &clock);

        let (levels, _) = monitor.lock().unwrap().channel_levels(clock.now());
        assert!(levels[0] > 0.0);
    }

    #[test]
    fn test_truncated_message_ignored() {
        let monitor = shared_monitor();
        let clock = TickClock::new();

        forward_message(&[0x90, 60], &monitor, &clock);
        forward_message(&[0x90], &monitor, &clock);
        forward_message(&[], &monitor, &clock);

        let (levels, _) = monitor.lock().unwrap().channel_levels(clock.now());
        assert_eq!(levels, [0.0; CHANNEL_COUNT]);
    }

    #[test]
    fn test_system_reset_needs_no_data_bytes() {
        let monitor = shared_monitor();
        let clock = TickClock::new();

        forward_message(&[0x90, 60, 100], &monitor, &clock);
        forward_message(&[0xFF], &monitor, &clock);

        let (levels, _) = monitor.lock().unwrap().channel_levels(clock.now());
        assert_eq!(levels, [0.0; CHANNEL_COUNT]);
    }
}
