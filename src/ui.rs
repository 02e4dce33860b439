/*
 *  ui.rs
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

//! Transient system-message presentation.
//!
//! A small state machine that overlays the meter display with short status
//! text: plain messages time out after a few seconds, spinner messages
//! animate until replaced, and an idle daemon can fade into power saving
//! (backlight off). The meter rendering itself never routes through here.

use arrayvec::ArrayString;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Primitive, PrimitiveStyle, Rectangle},
    text::Text,
};
use log::debug;

use crate::ticks::{elapsed_millis, Ticks};

const SPINNER_CHARS: [u8; 14] = *b"___-''^^``-___";

/// Visible message columns; spinner messages spend the last two on the
/// animation (separator space plus spinner cell).
const MESSAGE_COLUMNS: usize = 20;
const SPINNER_TEXT_COLUMNS: usize = MESSAGE_COLUMNS - 2;

const MESSAGE_DISPLAY_TIME_MS: f32 = 3_000.0;
const MESSAGE_SPINNER_TIME_MS: f32 = 32.0;
const POWER_SAVING_FADE_TIME_MS: f32 = 3_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    None,
    DisplayingMessage,
    DisplayingSpinnerMessage,
    EnteringPowerSavingMode,
    InPowerSavingMode,
}

pub struct UserInterface {
    state: UiState,
    state_time: Ticks,
    spinner_index: usize,
    message: ArrayString<MESSAGE_COLUMNS>,
    backlight: bool,
}

impl UserInterface {
    pub fn new() -> Self {
        Self {
            state: UiState::None,
            state_time: 0,
            spinner_index: 0,
            message: ArrayString::new(),
            backlight: true,
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    /// Whether the overlay currently owns the frame.
    pub fn is_active(&self) -> bool {
        self.state != UiState::None
    }

    /// Backlight level the sink should apply.
    pub fn backlight_enabled(&self) -> bool {
        self.backlight
    }

    /// Show a transient message. Plain messages time out on their own;
    /// spinner messages stay (and animate) until replaced or cleared.
    pub fn show_message(&mut self, text: &str, spinner: bool, now: Ticks) {
        let columns = if spinner { SPINNER_TEXT_COLUMNS } else { MESSAGE_COLUMNS };
        self.message.clear();
        for c in text.chars().take(columns) {
            if self.message.try_push(c).is_err() {
                break;
            }
        }

        self.state = if spinner {
            self.spinner_index = 0;
            UiState::DisplayingSpinnerMessage
        } else {
            UiState::DisplayingMessage
        };
        self.state_time = now;
        self.backlight = true;
        debug!("ui message: {:?} (spinner: {})", self.message.as_str(), spinner);
    }

    /// Dismiss whatever is showing and hand the frame back to the meters.
    pub fn clear_message(&mut self) {
        if matches!(
            self.state,
            UiState::DisplayingMessage | UiState::DisplayingSpinnerMessage
        ) {
            self.state = UiState::None;
        }
    }

    /// Begin the power-saving fade; the backlight drops once the fade window
    /// elapses in `update`.
    pub fn enter_power_saving(&mut self, now: Ticks) {
        self.message.clear();
        let _ = self.message.try_push_str("Power saving mode");
        self.state = UiState::EnteringPowerSavingMode;
        self.state_time = now;
    }

    pub fn exit_power_saving(&mut self) {
        if matches!(
            self.state,
            UiState::EnteringPowerSavingMode | UiState::InPowerSavingMode
        ) {
            self.backlight = true;
            self.state = UiState::None;
        }
    }

    /// Advance timeouts and animation. Returns true when the presentation
    /// changed and the frame should be redrawn.
    pub fn update(&mut self, now: Ticks) -> bool {
        let delta_ms = elapsed_millis(now, self.state_time);

        match self.state {
            UiState::DisplayingMessage if delta_ms >= MESSAGE_DISPLAY_TIME_MS => {
                self.state = UiState::None;
                self.state_time = now;
                true
            }

            UiState::DisplayingSpinnerMessage if delta_ms >= MESSAGE_SPINNER_TIME_MS => {
                self.spinner_index = (self.spinner_index + 1) % SPINNER_CHARS.len();
                self.state_time = now;
                true
            }

            UiState::EnteringPowerSavingMode if delta_ms >= POWER_SAVING_FADE_TIME_MS => {
                debug!("entering power saving mode");
                self.backlight = false;
                self.state = UiState::InPowerSavingMode;
                self.state_time = now;
                true
            }

            _ => false,
        }
    }

    /// The full message line, spinner cell included.
    pub fn message_line(&self) -> ArrayString<{ MESSAGE_COLUMNS + 1 }> {
        let mut line = ArrayString::new();
        let _ = line.try_push_str(self.message.as_str());

        if self.state == UiState::DisplayingSpinnerMessage {
            // Pad to a fixed spinner column so the animation doesn't wander.
            while line.len() < SPINNER_TEXT_COLUMNS {
                let _ = line.try_push(' ');
            }
            let _ = line.try_push(' ');
            let _ = line.try_push(SPINNER_CHARS[self.spinner_index] as char);
        }

        line
    }

    /// Draw the overlay. Power saving renders nothing — the sink blanks the
    /// panel via `backlight_enabled`.
    pub fn draw<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.state {
            UiState::DisplayingMessage
            | UiState::DisplayingSpinnerMessage
            | UiState::EnteringPowerSavingMode => {}
            UiState::None | UiState::InPowerSavingMode => return Ok(()),
        }

        let size = display.bounding_box().size;
        let line = self.message_line();
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        // Single centered text row; short panels use the top row. The band
        // behind the text is blanked so the message reads over the meters,
        // the way a character LCD line would erase with spaces.
        let text_width = line.len() as i32 * 6;
        let x = ((size.width as i32 - text_width) / 2).max(0);
        let y = if size.height <= 32 { 12 } else { size.height as i32 / 2 };

        Rectangle::new(Point::new(0, y - 9), Size::new(size.width, 12))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(display)?;
        Text::new(line.as_str(), Point::new(x, y), style).draw(display)?;
        Ok(())
    }
}

impl Default for UserInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticks::millis_to_ticks;
    use crate::vframebuf::VarFrameBuf;

    #[test]
    fn test_plain_message_times_out() {
        let mut ui = UserInterface::new();
        let t0 = millis_to_ticks(1_000);
        ui.show_message("MIDI ready", false, t0);
        assert_eq!(ui.state(), UiState::DisplayingMessage);

        assert!(!ui.update(t0 + millis_to_ticks(2_999)));
        assert_eq!(ui.state(), UiState::DisplayingMessage);

        assert!(ui.update(t0 + millis_to_ticks(3_000)));
        assert_eq!(ui.state(), UiState::None);
        assert!(!ui.is_active());
    }

    #[test]
    fn test_spinner_advances_and_wraps() {
        let mut ui = UserInterface::new();
        let mut now = millis_to_ticks(1_000);
        ui.show_message("Connecting", true, now);

        let first = ui.message_line();
        assert!(first.as_str().ends_with(SPINNER_CHARS[0] as char));

        // Spinner messages never time out; they cycle.
        for step in 1..=SPINNER_CHARS.len() {
            now += millis_to_ticks(32);
            assert!(ui.update(now));
            assert_eq!(ui.state(), UiState::DisplayingSpinnerMessage);
            let expected = SPINNER_CHARS[step % SPINNER_CHARS.len()] as char;
            assert!(ui.message_line().as_str().ends_with(expected));
        }
    }

    #[test]
    fn test_spinner_line_has_fixed_width() {
        let mut ui = UserInterface::new();
        ui.show_message("Hi", true, millis_to_ticks(1_000));
        assert_eq!(ui.message_line().len(), MESSAGE_COLUMNS);
    }

    #[test]
    fn test_message_truncation() {
        let mut ui = UserInterface::new();
        ui.show_message(
            "This message is much longer than the panel",
            false,
            millis_to_ticks(1_000),
        );
        assert_eq!(ui.message_line().len(), MESSAGE_COLUMNS);
    }

    #[test]
    fn test_power_saving_sequence() {
        let mut ui = UserInterface::new();
        let t0 = millis_to_ticks(1_000);
        ui.enter_power_saving(t0);
        assert_eq!(ui.state(), UiState::EnteringPowerSavingMode);
        assert!(ui.backlight_enabled());

        assert!(ui.update(t0 + millis_to_ticks(3_000)));
        assert_eq!(ui.state(), UiState::InPowerSavingMode);
        assert!(!ui.backlight_enabled());

        ui.exit_power_saving();
        assert_eq!(ui.state(), UiState::None);
        assert!(ui.backlight_enabled());
    }

    #[test]
    fn test_new_message_wakes_from_power_saving() {
        let mut ui = UserInterface::new();
        let t0 = millis_to_ticks(1_000);
        ui.enter_power_saving(t0);
        ui.update(t0 + millis_to_ticks(3_000));
        assert!(!ui.backlight_enabled());

        ui.show_message("MIDI ready", false, t0 + millis_to_ticks(4_000));
        assert!(ui.backlight_enabled());
        assert_eq!(ui.state(), UiState::DisplayingMessage);
    }

    #[test]
    fn test_draw_renders_message_pixels() {
        let mut ui = UserInterface::new();
        ui.show_message("Hello", false, millis_to_ticks(1_000));

        let mut fb = VarFrameBuf::new(128, 64);
        ui.draw(&mut fb).unwrap();
        assert!(fb.as_slice().iter().any(|p| p.is_on()));
    }

    #[test]
    fn test_power_saving_draws_nothing() {
        let mut ui = UserInterface::new();
        let t0 = millis_to_ticks(1_000);
        ui.enter_power_saving(t0);
        ui.update(t0 + millis_to_ticks(3_000));

        let mut fb = VarFrameBuf::new(128, 64);
        ui.draw(&mut fb).unwrap();
        assert!(fb.as_slice().iter().all(|p| !p.is_on()));
    }
}
