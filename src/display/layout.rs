/*
 *  display/layout.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Canvas-derived geometry for the now playing screens
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

use embedded_graphics::prelude::Point;

use crate::artwork::ArtSize;

/// Width of the header block kept clear for the play/pause glyph
const HEADER_BLOCK_WIDTH: u32 = 12;
/// Rows covered by the two text lines
const HEADER_HEIGHT: u32 = 13;
/// Margin left around the compact artwork on the tighter axis
const ART_MARGIN: u32 = 16;

/// Pixel geometry for one canvas size.
///
/// Every position is derived from the canvas dimensions, so a 64x64 panel
/// gets the classic layout and anything else scales the same rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactLayout {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Side of the square compact artwork
    pub art_size: u32,
    /// Top-left of the compact artwork
    pub art_origin: Point,
    /// Left edge of both text lines before scrolling
    pub text_x: i32,
    pub title_y: i32,
    pub artist_y: i32,
    /// Visible text run; longer text scrolls
    pub line_width: u32,
    /// Rows masked at the left gutter and right header block
    pub header_height: u32,
    /// First column of the right header block
    pub header_block_x: i32,
    /// Top-left of the play/pause glyph
    pub glyph_origin: Point,
    /// Top row of the progress bar
    pub bar_y: i32,
    pub bar_height: u32,
}

impl CompactLayout {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let art_size = width.min(height).saturating_sub(ART_MARGIN);
        let header_block_x = width.saturating_sub(HEADER_BLOCK_WIDTH) as i32;
        Self {
            width,
            height,
            art_size,
            art_origin: Point::new(((width - art_size.min(width)) / 2) as i32, (HEADER_HEIGHT + 1) as i32),
            text_x: 1,
            title_y: 1,
            artist_y: 7,
            line_width: width.saturating_sub(HEADER_BLOCK_WIDTH),
            header_height: HEADER_HEIGHT,
            header_block_x,
            glyph_origin: Point::new(header_block_x + 3, 3),
            bar_y: height as i32 - 2,
            bar_height: 2,
        }
    }

    /// Pixel dimensions a bitmap should have for `size`.
    pub fn art_dims(&self, size: ArtSize) -> (u32, u32) {
        match size {
            ArtSize::Compact => (self.art_size, self.art_size),
            ArtSize::Fullscreen => (self.width, self.height),
        }
    }
}
