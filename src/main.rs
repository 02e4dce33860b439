/*
 *  main.rs
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

use std::sync::{Arc, Mutex};

use anyhow::Context;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};

use midivu::config;
use midivu::input::{MidiSource, MidiSourceError};
use midivu::meters::ChannelMeters;
use midivu::monitor::MidiMonitor;
use midivu::pacer::Pacer;
use midivu::sink::{DisplaySink, TerminalSink};
use midivu::ticks::{elapsed_millis, TickClock};
use midivu::ui::UserInterface;
use midivu::vframebuf::VarFrameBuf;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Blank the panel after this long without channel activity.
const POWER_SAVING_IDLE_MS: f32 = 5.0 * 60.0 * 1_000.0;
/// Retry interval while waiting for a MIDI port to appear.
const MIDI_RETRY_MS: f32 = 2_000.0;

/// Wait for SIGINT, SIGTERM, or SIGHUP.
async fn wait_for_shutdown() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, shutting down"),
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        _ = sighup.recv() => info!("SIGHUP received, shutting down"),
    }
    Ok(())
}

/// Try to open the MIDI input; `NoPorts`/`PortNotFound` are retryable (the
/// device may just not be plugged in yet), anything else is fatal.
fn try_connect(
    port_filter: Option<&str>,
    monitor: &Arc<Mutex<MidiMonitor>>,
    clock: TickClock,
) -> anyhow::Result<Option<MidiSource>> {
    match MidiSource::connect(port_filter, monitor.clone(), clock) {
        Ok(source) => Ok(Some(source)),
        Err(err @ (MidiSourceError::NoPorts | MidiSourceError::PortNotFound(_))) => {
            warn!("{err}; waiting for device");
            Ok(None)
        }
        Err(err) => Err(err).context("MIDI input setup failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, cli) = config::load()?;

    let default_level = if cli.debug {
        "debug"
    } else {
        cfg.log_level.as_deref().unwrap_or("info")
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.list_ports {
        let names = MidiSource::port_names().context("MIDI port enumeration failed")?;
        if names.is_empty() {
            println!("no MIDI input ports");
        } else {
            for name in names {
                println!("{name}");
            }
        }
        return Ok(());
    }

    let clock = TickClock::new();
    let monitor = Arc::new(Mutex::new(MidiMonitor::new(cfg.tuning())));

    let (width, height) = cfg.display_size();
    let mut frame = VarFrameBuf::new(width, height);
    let meters = ChannelMeters::new(cfg.meter_channels(), cfg.bar_bases());
    let mut ui = UserInterface::new();
    let mut sink = TerminalSink::new();
    let mut pacer = Pacer::new(cfg.fps());

    info!(
        "display {}x{} @ {} fps, {} channel meters",
        width,
        height,
        cfg.fps(),
        meters.channels()
    );

    let mut source = try_connect(cfg.midi_port.as_deref(), &monitor, clock)?;
    let mut last_retry = clock.now();
    match source.as_ref() {
        Some(source) => {
            ui.show_message(&format!("MIDI: {}", source.port_name()), false, clock.now());
        }
        None => ui.show_message("Waiting for MIDI", true, clock.now()),
    }

    let mut last_activity = clock.now();
    let mut backlight = true;

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        let wait = pacer.until_next_frame();
        tokio::select! {
            result = &mut shutdown => {
                result.context("signal handler setup failed")?;
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let now = clock.now();

        // Late device arrival / hotplug.
        if source.is_none() && elapsed_millis(now, last_retry) >= MIDI_RETRY_MS {
            last_retry = now;
            source = try_connect(cfg.midi_port.as_deref(), &monitor, clock)?;
            if let Some(source) = source.as_ref() {
                ui.show_message(&format!("MIDI: {}", source.port_name()), false, now);
            }
        }

        let (levels, peaks) = match monitor.lock() {
            Ok(mut monitor) => monitor.channel_levels(now),
            Err(poisoned) => {
                error!("monitor lock poisoned; resetting");
                let mut monitor = poisoned.into_inner();
                monitor.reset();
                monitor.channel_levels(now)
            }
        };

        // Idle tracking drives power saving; any live channel wakes it.
        if levels.iter().any(|level| *level > 0.0) {
            last_activity = now;
            ui.exit_power_saving();
        } else if source.is_some()
            && !ui.is_active()
            && elapsed_millis(now, last_activity) >= POWER_SAVING_IDLE_MS
        {
            ui.enter_power_saving(now);
        }

        ui.update(now);
        if ui.backlight_enabled() != backlight {
            backlight = ui.backlight_enabled();
            sink.set_backlight(backlight)?;
        }

        frame.clear(BinaryColor::Off).ok();
        meters.draw(&mut frame, &levels, &peaks).ok();
        ui.draw(&mut frame).ok();
        sink.present(&frame)?;
    }

    drop(source);
    info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
