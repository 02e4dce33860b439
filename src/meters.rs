//! Per-channel level/peak bar meters for `embedded-graphics` targets.
//!
//! One vertical bar per MIDI channel with a one-pixel peak cap line above
//! it, fed straight from the monitor's level query. Rendering only: this
//! widget owns no channel state.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, Primitive, PrimitiveStyle, Rectangle},
};

/// Gap between adjacent bars, in pixels.
const BAR_SPACING: u32 = 2;
/// Left margin before the first bar.
const BAR_X_OFFSET: u32 = 2;

pub struct ChannelMeters {
    channels: usize,
    /// Keep silent channels visible as a single base pixel row.
    draw_bar_bases: bool,
}

impl ChannelMeters {
    pub fn new(channels: usize, draw_bar_bases: bool) -> Self {
        Self {
            channels: channels.clamp(1, crate::monitor::CHANNEL_COUNT),
            draw_bar_bases,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Draw bars and peak caps for the first `channels` entries of
    /// `levels`/`peaks` across the full target area.
    pub fn draw<D>(&self, display: &mut D, levels: &[f32], peaks: &[f32]) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let size = display.bounding_box().size;
        let channels = self.channels.min(levels.len()).min(peaks.len());
        if channels == 0 || size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let spacing_total = channels as u32 * BAR_SPACING;
        let bar_width = size.width.saturating_sub(spacing_total).max(channels as u32)
            / channels as u32;
        let bar_max_y = size.height - 1;

        let bar_style = PrimitiveStyle::with_fill(BinaryColor::On);
        let peak_style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

        for channel in 0..channels {
            let x1 = (BAR_X_OFFSET + channel as u32 * (bar_width + BAR_SPACING)) as i32;
            let x2 = x1 + bar_width as i32 - 1;

            let level_pixels = (levels[channel].clamp(0.0, 1.0) * bar_max_y as f32) as u32;
            if level_pixels > 0 || self.draw_bar_bases {
                let y1 = (bar_max_y - level_pixels) as i32;
                Rectangle::new(
                    Point::new(x1, y1),
                    Size::new(bar_width, level_pixels + 1),
                )
                .into_styled(bar_style)
                .draw(display)?;
            }

            let peak_pixels = (peaks[channel].clamp(0.0, 1.0) * bar_max_y as f32) as u32;
            if peak_pixels > 0 {
                let y = (bar_max_y - peak_pixels) as i32;
                Line::new(Point::new(x1, y), Point::new(x2, y))
                    .into_styled(peak_style)
                    .draw(display)?;
            }
        }

        Ok(())
    }
}
