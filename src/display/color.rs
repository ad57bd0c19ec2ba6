/*
 *  display/color.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Palette for the now playing screens
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

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;

pub const BACKGROUND: Rgb888 = Rgb888::BLACK;
pub const TEXT: Rgb888 = Rgb888::WHITE;
pub const PROGRESS: Rgb888 = Rgb888::new(102, 240, 110);
pub const TRACK: Rgb888 = Rgb888::new(100, 100, 100);

/// Colours used by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb888,
    pub title: Rgb888,
    pub artist: Rgb888,
    /// Progress fill and the play/pause glyph
    pub progress: Rgb888,
    /// Unfilled part of the progress bar
    pub track: Rgb888,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: BACKGROUND,
            title: TEXT,
            artist: TEXT,
            progress: PROGRESS,
            track: TRACK,
        }
    }
}
