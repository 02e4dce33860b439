/*
 *  sink.rs
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

//! Where finished frames go. Panel hardware is out of scope; the terminal
//! sink emulates one for development and the mock sink backs tests.

use std::io::{self, Stdout, Write};

use thiserror::Error;

use crate::vframebuf::VarFrameBuf;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait DisplaySink {
    /// Push a finished frame to the panel.
    fn present(&mut self, frame: &VarFrameBuf) -> Result<(), SinkError>;

    /// Backlight / blanking control. A dark backlight blanks the panel
    /// regardless of frame content.
    fn set_backlight(&mut self, on: bool) -> Result<(), SinkError>;
}

/// Renders frames in a terminal with half-block characters, two pixel rows
/// per text line. Stands in for a 128x64-class monochrome panel.
pub struct TerminalSink {
    out: Stdout,
    backlight: bool,
    first_frame: bool,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            backlight: true,
            first_frame: true,
        }
    }

    fn glyph(upper: bool, lower: bool) -> char {
        match (upper, lower) {
            (true, true) => '\u{2588}',  // full block
            (true, false) => '\u{2580}', // upper half
            (false, true) => '\u{2584}', // lower half
            (false, false) => ' ',
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        // Restore the cursor if a frame ever hid it.
        if !self.first_frame {
            let _ = self.out.write_all(b"\x1b[?25h");
            let _ = self.out.flush();
        }
    }
}

impl DisplaySink for TerminalSink {
    fn present(&mut self, frame: &VarFrameBuf) -> Result<(), SinkError> {
        let (w, h) = (frame.width(), frame.height());
        let pixels = frame.as_slice();

        let mut text = String::with_capacity((w + 1) * (h / 2 + 1) + 16);
        if self.first_frame {
            // Clear once, then repaint in place.
            text.push_str("\x1b[2J\x1b[?25l");
            self.first_frame = false;
        }
        text.push_str("\x1b[H");

        for y in (0..h).step_by(2) {
            for x in 0..w {
                let upper = self.backlight && pixels[y * w + x].is_on();
                let lower = self.backlight
                    && y + 1 < h
                    && pixels[(y + 1) * w + x].is_on();
                text.push(Self::glyph(upper, lower));
            }
            text.push('\n');
        }

        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), SinkError> {
        self.backlight = on;
        Ok(())
    }
}

/// Capture-only sink for tests and headless runs.
pub struct MockSink {
    pub frames: usize,
    pub last_frame: Option<Vec<u8>>,
    pub backlight: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            frames: 0,
            last_frame: None,
            backlight: true,
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for MockSink {
    fn present(&mut self, frame: &VarFrameBuf) -> Result<(), SinkError> {
        self.frames += 1;
        self.last_frame = Some(frame.packed_bytes());
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), SinkError> {
        self.backlight = on;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_glyph_selection() {
        assert_eq!(TerminalSink::glyph(true, true), '\u{2588}');
        assert_eq!(TerminalSink::glyph(true, false), '\u{2580}');
        assert_eq!(TerminalSink::glyph(false, true), '\u{2584}');
        assert_eq!(TerminalSink::glyph(false, false), ' ');
    }

    #[test]
    fn test_mock_sink_captures_frames() {
        let mut sink = MockSink::new();
        let mut fb = VarFrameBuf::new(8, 2);
        fb.clear(BinaryColor::On).unwrap();

        sink.present(&fb).unwrap();
        sink.present(&fb).unwrap();
        assert_eq!(sink.frames, 2);
        assert_eq!(sink.last_frame.as_deref(), Some(&[0xFF, 0xFF][..]));

        sink.set_backlight(false).unwrap();
        assert!(!sink.backlight);
    }
}
