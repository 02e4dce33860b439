/*
 *  tests/monitor_integration.rs
 *
 *  End-to-end checks of the channel activity monitor through the public
 *  library surface, driven with synthetic tick stamps.
 *
 *  MidiVu - MIDI channel activity meters
 */

use midivu::envelope::EnvelopeTuning;
use midivu::meters::ChannelMeters;
use midivu::monitor::{MidiMonitor, CHANNEL_COUNT, PERCUSSION_CHANNEL};
use midivu::sink::{DisplaySink, MockSink};
use midivu::ticks::{millis_to_ticks, Ticks};
use midivu::ui::{UiState, UserInterface};
use midivu::vframebuf::VarFrameBuf;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const CC: u8 = 0xB0;

fn tuning() -> EnvelopeTuning {
    EnvelopeTuning::default()
}

#[test]
fn untouched_channels_stay_at_zero() {
    let mut monitor = MidiMonitor::new(tuning());
    monitor.handle_short_message(NOTE_ON | 0x03, 60, 100, millis_to_ticks(1_000));

    for t in [1u32, millis_to_ticks(1_000), millis_to_ticks(90_000)] {
        let (levels, peaks) = monitor.channel_levels(t);
        for channel in (0..CHANNEL_COUNT).filter(|c| *c != 3) {
            assert_eq!(levels[channel], 0.0, "channel {channel} at t {t}");
            assert_eq!(peaks[channel], 0.0, "channel {channel} at t {t}");
        }
    }
}

#[test]
fn note_on_is_instantaneous_and_scaled() {
    let mut monitor = MidiMonitor::new(tuning());
    let now = millis_to_ticks(2_000);

    let (velocity, volume, expression) = (96u8, 80u8, 64u8);
    monitor.handle_short_message(CC, 0x07, volume, now);
    monitor.handle_short_message(CC, 0x0B, expression, now);
    monitor.handle_short_message(NOTE_ON, 72, velocity, now);

    // Queried at the very same tick: attack is an immediate plateau.
    let (levels, peaks) = monitor.channel_levels(now);
    let expected =
        (velocity as f32 / 127.0) * (volume as f32 / 127.0) * (expression as f32 / 127.0);
    assert!((levels[0] - expected).abs() < 1e-6);
    assert!(peaks[0] >= levels[0]);
}

#[test]
fn release_decays_monotonically_to_silence() {
    let mut monitor = MidiMonitor::new(tuning());
    let decay_ms = tuning().decay_release_ms as u32;

    let on = millis_to_ticks(1_000);
    monitor.handle_short_message(CC, 0x07, 127, on);
    monitor.handle_short_message(NOTE_ON, 60, 127, on);
    let off = on + millis_to_ticks(500);
    monitor.handle_short_message(NOTE_OFF, 60, 64, off);

    let mut previous = f32::INFINITY;
    for step_ms in (0..=decay_ms).step_by(25) {
        let (levels, _) = monitor.channel_levels(off + millis_to_ticks(step_ms));
        assert!(levels[0] <= previous, "level must not rise during release");
        previous = levels[0];
    }

    // Exactly at the decay window the envelope has reached zero, and stays
    // there for any later query.
    let (levels, _) = monitor.channel_levels(off + millis_to_ticks(decay_ms));
    assert_eq!(levels[0], 0.0);
    let (levels, _) = monitor.channel_levels(off + millis_to_ticks(10 * decay_ms));
    assert_eq!(levels[0], 0.0);
}

#[test]
fn percussion_fades_without_release() {
    let mut monitor = MidiMonitor::new(tuning());
    let status = NOTE_ON | PERCUSSION_CHANNEL as u8;
    let hit = millis_to_ticks(3_000);

    monitor.handle_short_message(CC | PERCUSSION_CHANNEL as u8, 0x07, 127, hit);
    monitor.handle_short_message(status, 36, 127, hit);

    let (at_hit, _) = monitor.channel_levels(hit);
    assert_eq!(at_hit[PERCUSSION_CHANNEL], 1.0);

    // Never a sustained plateau: strictly below full level one frame later.
    let (later, _) = monitor.channel_levels(hit + millis_to_ticks(33));
    assert!(later[PERCUSSION_CHANNEL] < 1.0);
    assert!(later[PERCUSSION_CHANNEL] > 0.0);
}

#[test]
fn retrigger_resets_envelope_mid_decay() {
    let mut monitor = MidiMonitor::new(tuning());
    let on = millis_to_ticks(1_000);
    monitor.handle_short_message(CC, 0x07, 127, on);
    monitor.handle_short_message(NOTE_ON, 60, 127, on);
    monitor.handle_short_message(NOTE_OFF, 60, 0, on + millis_to_ticks(10));

    let mid = on + millis_to_ticks(10 + tuning().decay_release_ms as u32 / 3);
    let (decaying, _) = monitor.channel_levels(mid);
    assert!(decaying[0] < 1.0);

    monitor.handle_short_message(NOTE_ON, 60, 127, mid);
    let (retriggered, _) = monitor.channel_levels(mid);
    assert_eq!(retriggered[0], 1.0);
}

#[test]
fn channel_mode_messages_silence_everything() {
    // 0x78 All Sound Off .. 0x7F Mono Off all act as All Notes Off.
    for mode_cc in [0x78u8, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F] {
        let mut monitor = MidiMonitor::new(tuning());
        let now = millis_to_ticks(1_000);

        for channel in 0..CHANNEL_COUNT as u8 {
            monitor.handle_short_message(NOTE_ON | channel, 60 + channel, 100, now);
        }
        monitor.handle_short_message(CC | 0x0F, mode_cc, 0, now + 1);

        let (levels, _) = monitor.channel_levels(now + millis_to_ticks(1));
        assert_eq!(levels, [0.0; CHANNEL_COUNT], "mode cc {mode_cc:#04x}");
    }
}

#[test]
fn reset_semantics_follow_the_midi_carve_out() {
    let mut monitor = MidiMonitor::new(tuning());
    let now = millis_to_ticks(1_000);

    monitor.handle_short_message(CC, 0x07, 20, now); // volume
    monitor.handle_short_message(CC, 0x0A, 0, now); // pan
    monitor.handle_short_message(CC, 0x0B, 40, now); // expression
    monitor.handle_short_message(NOTE_ON, 60, 127, now);

    // Reset All Controllers: expression back to 127, volume untouched, and
    // sounding notes keep sounding.
    monitor.handle_short_message(CC, 0x79, 0, now);
    let (levels, _) = monitor.channel_levels(now);
    let expected = 1.0 * (20.0 / 127.0) * 1.0;
    assert!((levels[0] - expected).abs() < 1e-6);

    // System Reset: notes gone and volume back at the power-on default.
    monitor.handle_short_message(0xFF, 0, 0, now);
    monitor.handle_short_message(NOTE_ON, 60, 127, now);
    let (levels, _) = monitor.channel_levels(now);
    let expected = 100.0 / 127.0;
    assert!((levels[0] - expected).abs() < 1e-6);
}

#[test]
fn peak_holds_then_falls_onto_live_level() {
    let hold_ms = tuning().peak_hold_ms;
    let falloff_ms = tuning().peak_falloff_ms;
    let mut monitor = MidiMonitor::new(tuning());

    let on = millis_to_ticks(1_000);
    monitor.handle_short_message(CC, 0x07, 127, on);
    monitor.handle_short_message(NOTE_ON, 60, 127, on);
    let (_, peaks) = monitor.channel_levels(on);
    assert_eq!(peaks[0], 1.0);

    monitor.handle_short_message(NOTE_OFF, 60, 0, on);

    // Within the hold window the peak is pinned even as the level decays.
    let held = on + millis_to_ticks(hold_ms as u32 - 10);
    let (levels, peaks) = monitor.channel_levels(held);
    assert_eq!(peaks[0], 1.0);
    assert!(levels[0] < peaks[0]);

    // After hold + falloff the peak has met the (now silent) level.
    let done = on + millis_to_ticks((hold_ms + falloff_ms) as u32 + 10);
    let (levels, peaks) = monitor.channel_levels(done);
    assert_eq!(levels[0], 0.0);
    assert!(peaks[0] <= 0.01);

    // Peak never dips below the live level at any sampled instant.
    let mut monitor = MidiMonitor::new(tuning());
    monitor.handle_short_message(CC, 0x07, 127, on);
    monitor.handle_short_message(NOTE_ON, 60, 127, on);
    for ms in (0..5_000).step_by(33) {
        let t = on + millis_to_ticks(ms);
        let (levels, peaks) = monitor.channel_levels(t);
        assert!(peaks[0] >= levels[0] - 1e-6);
    }
}

#[test]
fn wraparound_queries_stay_in_range() {
    let mut monitor = MidiMonitor::new(tuning());

    let near_wrap: Ticks = u32::MAX - millis_to_ticks(2);
    monitor.handle_short_message(CC, 0x07, 127, near_wrap);
    monitor.handle_short_message(NOTE_ON, 60, 127, near_wrap);
    monitor.handle_short_message(NOTE_ON | 0x09, 36, 127, near_wrap);

    // Queries numerically before the event stamps (i.e. after the counter
    // wrapped, or out of order) must stay bounded.
    for query in [0u32 + 1, millis_to_ticks(1), millis_to_ticks(500), u32::MAX] {
        let (levels, peaks) = monitor.channel_levels(query);
        for channel in 0..CHANNEL_COUNT {
            assert!((0.0..=1.0).contains(&levels[channel]), "query {query}");
            assert!((0.0..=1.0).contains(&peaks[channel]), "query {query}");
        }
    }
}

#[test]
fn full_pipeline_renders_activity_to_a_sink() {
    let mut monitor = MidiMonitor::new(tuning());
    let meters = ChannelMeters::new(CHANNEL_COUNT, true);
    let mut ui = UserInterface::new();
    let mut sink = MockSink::new();
    let mut frame = VarFrameBuf::new(128, 64);

    let now = millis_to_ticks(1_000);
    monitor.handle_short_message(NOTE_ON, 60, 127, now);
    ui.show_message("MIDI: test port", false, now);

    let (levels, peaks) = monitor.channel_levels(now);
    meters.draw(&mut frame, &levels, &peaks).unwrap();
    ui.draw(&mut frame).unwrap();
    sink.present(&frame).unwrap();

    assert_eq!(sink.frames, 1);
    let packed = sink.last_frame.expect("frame captured");
    assert!(packed.iter().any(|byte| *byte != 0));

    // Message overlay times out; meters keep the frame alive.
    ui.update(now + millis_to_ticks(3_001));
    assert_eq!(ui.state(), UiState::None);
}
