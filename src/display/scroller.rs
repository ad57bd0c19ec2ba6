/*
 *  display/scroller.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Marquee state for the title and artist lines
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

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::iso_8859_1::FONT_4X6;
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Font used for both text lines
pub const TEXT_FONT: &MonoFont<'static> = &FONT_4X6;

/// Gap between the end of the text and its repeat
pub const SCROLL_SPACER: &str = "     ";

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str) -> u32 {
    let advance = TEXT_FONT.character_size.width + TEXT_FONT.character_spacing;
    text.chars().count() as u32 * advance
}

/// One scrolling line.
///
/// The offset moves one pixel per advance once the line has sat still for
/// the scroll delay, and wraps to 0 after a full `text + spacer` cycle.
#[derive(Debug, Clone)]
pub struct ScrollState {
    text: String,
    offset: u32,
    last_reset: Instant,
}

impl ScrollState {
    pub fn new(now: Instant) -> Self {
        Self { text: String::new(), offset: 0, last_reset: now }
    }

    /// Replace the text, resetting when it differs. Returns whether it did.
    pub fn set_text(&mut self, text: &str, now: Instant) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        self.reset(now);
        true
    }

    pub fn reset(&mut self, now: Instant) {
        self.offset = 0;
        self.last_reset = now;
    }

    pub fn clear(&mut self, now: Instant) {
        self.text.clear();
        self.reset(now);
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn offset(&self) -> u32 { self.offset }
    pub fn last_reset(&self) -> Instant { self.last_reset }

    pub fn scrolls(&self, line_width: u32) -> bool {
        text_width(&self.text) > line_width
    }

    /// Offset at which the doubled text lines up with its start again.
    pub fn cycle_width(&self) -> u32 {
        text_width(&self.text) + text_width(SCROLL_SPACER)
    }

    /// What to draw: the text, doubled with a spacer when it scrolls.
    pub fn display_text(&self, line_width: u32) -> Cow<'_, str> {
        if self.scrolls(line_width) {
            Cow::Owned(format!("{}{}{}", self.text, SCROLL_SPACER, self.text))
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    /// Step the marquee for one tick.
    ///
    /// `freeze` pins the line at its start (timer restarted) while the other
    /// line is mid-cycle.
    pub fn advance(&mut self, now: Instant, line_width: u32, scroll_delay: Duration, freeze: bool) {
        if !self.scrolls(line_width) {
            self.offset = 0;
            return;
        }
        if now.saturating_duration_since(self.last_reset) >= scroll_delay {
            self.offset += 1;
        }
        if freeze || self.offset >= self.cycle_width() {
            self.reset(now);
        }
    }
}
