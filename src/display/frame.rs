/*
 *  display/frame.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized RGB frame, the unit handed to a display sink
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use image::RgbImage;

/// Row-major RGB canvas that embedded-graphics can draw into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<Rgb888>,
    w: usize,
    h: usize,
}

impl Frame {
    pub fn new(width: u32, height: u32, fill: Rgb888) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn black(width: u32, height: u32) -> Self {
        Self::new(width, height, Rgb888::BLACK)
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    /// Out of bounds reads yield `None`.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.idx(Point::new(x, y)).map(|i| self.buf[i])
    }

    pub fn clear_color(&mut self, color: Rgb888) {
        self.buf.fill(color);
    }

    pub fn is_blank(&self) -> bool {
        self.buf.iter().all(|c| *c == Rgb888::BLACK)
    }

    /// Pixels of exactly `color`.
    pub fn count(&self, color: Rgb888) -> usize {
        self.buf.iter().filter(|c| **c == color).count()
    }

    /// Packed `RGBRGB...`, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buf.len() * 3);
        for c in &self.buf {
            out.extend_from_slice(&[c.r(), c.g(), c.b()]);
        }
        out
    }

    /// Binary PPM, with optional comment lines after the dimensions.
    pub fn to_ppm(&self, comment: Option<&str>) -> Vec<u8> {
        let mut header = format!("P6\n{} {}\n", self.w, self.h);
        if let Some(comment) = comment {
            header.push_str(comment);
            header.push('\n');
        }
        header.push_str("255\n");
        let mut out = header.into_bytes();
        out.extend(self.to_rgb_bytes());
        out
    }

    /// Copy `image` with its top-left at `origin`, clipped to the frame.
    pub fn blit(&mut self, image: &RgbImage, origin: Point) {
        for (x, y, px) in image.enumerate_pixels() {
            let p = origin + Point::new(x as i32, y as i32);
            if let Some(i) = self.idx(p) {
                self.buf[i] = Rgb888::new(px[0], px[1], px[2]);
            }
        }
    }

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

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors arrive row-major over the unclipped area
        for (p, c) in area.points().zip(colors) {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        let Some(bottom_right) = clipped.bottom_right() else {
            return Ok(());
        };
        let (x0, x1) = (clipped.top_left.x as usize, bottom_right.x as usize);
        for y in clipped.top_left.y as usize..=bottom_right.y as usize {
            let row = y * self.w;
            self.buf[row + x0..=row + x1].fill(color);
        }
        Ok(())
    }
}
