/*
 *  vframebuf.rs
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

/// A runtime-sized monochrome framebuffer for embedded-graphics. Widgets
/// draw into it off-screen; a sink presents the finished frame.
#[derive(Debug, Clone)]
pub struct VarFrameBuf {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl VarFrameBuf {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Immutable raw access, row-major.
    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    /// Pack to bytes for a panel or sink, 8 pixels per byte, LSB first.
    pub fn packed_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; (self.buf.len() + 7) / 8];
        for (i, pixel) in self.buf.iter().enumerate() {
            if pixel.is_on() {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    /// Map (x,y) to linear index; None when out of bounds.
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for VarFrameBuf {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for VarFrameBuf {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Primitive, PrimitiveStyle, Rectangle};

    #[test]
    fn test_out_of_bounds_draw_is_clipped() {
        let mut fb = VarFrameBuf::new(8, 8);
        fb.draw_iter([
            Pixel(Point::new(-1, 0), BinaryColor::On),
            Pixel(Point::new(0, 100), BinaryColor::On),
            Pixel(Point::new(3, 3), BinaryColor::On),
        ])
        .unwrap();
        assert_eq!(
            fb.as_slice().iter().filter(|p| p.is_on()).count(),
            1
        );
    }

    #[test]
    fn test_packed_bytes_lsb_first() {
        let mut fb = VarFrameBuf::new(8, 1);
        Rectangle::new(Point::new(0, 0), Size::new(2, 1))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.packed_bytes(), vec![0b0000_0011]);
    }

    #[test]
    fn test_clear() {
        let mut fb = VarFrameBuf::new(4, 4);
        fb.clear(BinaryColor::On).unwrap();
        assert!(fb.as_slice().iter().all(|p| p.is_on()));
        fb.clear(BinaryColor::Off).unwrap();
        assert!(fb.as_slice().iter().all(|p| !p.is_on()));
    }
}
