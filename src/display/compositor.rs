/*
 *  display/compositor.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Draws one frame for a display mode and animation state
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

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::display::DisplayMode;
use crate::display::color::Palette;
use crate::display::frame::Frame;
use crate::display::layout::CompactLayout;
use crate::display::scroller::{ScrollState, TEXT_FONT};
use crate::display::state_machine::AnimationState;

/// Play triangle as vertical runs `(dx, y0, y1)` from the glyph origin
const PLAY_GLYPH: [(i32, i32, i32); 6] = [(0, 0, 6), (1, 1, 5), (2, 1, 5), (3, 2, 4), (4, 2, 4), (5, 3, 3)];
/// Pause bars, two columns each
const PAUSE_GLYPH: [(i32, i32, i32); 4] = [(0, 0, 6), (1, 0, 6), (4, 0, 6), (5, 0, 6)];

fn paint<D>(frame: &mut Frame, item: &D)
where
    D: Drawable<Color = Rgb888>,
{
    match item.draw(frame) {
        Ok(_) => {}
        Err(never) => match never {},
    }
}

/// Stateless renderer; everything it draws comes from its arguments.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    layout: CompactLayout,
    palette: Palette,
}

impl FrameCompositor {
    pub fn new(layout: CompactLayout) -> Self {
        Self::with_palette(layout, Palette::default())
    }

    pub fn with_palette(layout: CompactLayout, palette: Palette) -> Self {
        Self { layout, palette }
    }

    pub fn layout(&self) -> &CompactLayout { &self.layout }

    pub fn blank(&self) -> Frame {
        Frame::black(self.layout.width, self.layout.height)
    }

    pub fn compose(&self, mode: DisplayMode, anim: &AnimationState, progress: f32, is_playing: bool) -> Frame {
        match mode {
            DisplayMode::Inactive => self.blank(),
            DisplayMode::FullscreenArt => self.compose_fullscreen(anim),
            DisplayMode::CompactNowPlaying => self.compose_compact(anim, progress, is_playing),
        }
    }

    fn compose_fullscreen(&self, anim: &AnimationState) -> Frame {
        let mut frame = self.blank();
        if let Some(bitmap) = anim.artwork() {
            self.blit_scaled(&mut frame, bitmap, self.layout.width, self.layout.height, Point::zero());
        }
        frame
    }

    fn compose_compact(&self, anim: &AnimationState, progress: f32, is_playing: bool) -> Frame {
        let l = &self.layout;
        let mut frame = Frame::new(l.width, l.height, self.palette.background);

        if let Some(bitmap) = anim.artwork() {
            self.blit_scaled(&mut frame, bitmap, l.art_size, l.art_size, l.art_origin);
        }

        self.draw_line(&mut frame, anim.title(), l.title_y, self.palette.title);
        self.draw_line(&mut frame, anim.artist(), l.artist_y, self.palette.artist);

        // gutters hide text that scrolled past the line edges
        let mask = PrimitiveStyle::with_fill(self.palette.background);
        paint(&mut frame, &Rectangle::new(Point::zero(), Size::new(1, l.header_height)).into_styled(mask));
        paint(
            &mut frame,
            &Rectangle::new(
                Point::new(l.header_block_x, 0),
                Size::new(l.width.saturating_sub(l.header_block_x as u32), l.header_height),
            )
            .into_styled(mask),
        );

        self.draw_progress(&mut frame, progress);
        self.draw_glyph(&mut frame, is_playing);
        frame
    }

    fn blit_scaled(&self, frame: &mut Frame, bitmap: &RgbImage, width: u32, height: u32, origin: Point) {
        if bitmap.dimensions() == (width, height) {
            frame.blit(bitmap, origin);
        } else {
            // stale size while the right one is being fetched
            let scaled = imageops::resize(bitmap, width, height, FilterType::Triangle);
            frame.blit(&scaled, origin);
        }
    }

    fn draw_line(&self, frame: &mut Frame, line: &ScrollState, y: i32, color: Rgb888) {
        if line.text().is_empty() {
            return;
        }
        let style = MonoTextStyle::new(TEXT_FONT, color);
        let text = line.display_text(self.layout.line_width);
        let x = self.layout.text_x - line.offset() as i32;
        paint(frame, &Text::with_baseline(&text, Point::new(x, y), style, Baseline::Top));
    }

    fn draw_progress(&self, frame: &mut Frame, progress: f32) {
        let l = &self.layout;
        paint(
            frame,
            &Rectangle::new(Point::new(0, l.bar_y), Size::new(l.width, l.bar_height))
                .into_styled(PrimitiveStyle::with_fill(self.palette.track)),
        );
        let filled = (progress.clamp(0.0, 1.0) * l.width as f32).floor() as u32;
        if filled > 0 {
            paint(
                frame,
                &Rectangle::new(Point::new(0, l.bar_y), Size::new(filled.min(l.width), l.bar_height))
                    .into_styled(PrimitiveStyle::with_fill(self.palette.progress)),
            );
        }
    }

    /// Pause bars while playing, a play triangle otherwise.
    fn draw_glyph(&self, frame: &mut Frame, is_playing: bool) {
        let origin = self.layout.glyph_origin;
        let style = PrimitiveStyle::with_stroke(self.palette.progress, 1);
        let runs: &[(i32, i32, i32)] = if is_playing { &PAUSE_GLYPH } else { &PLAY_GLYPH };
        for &(dx, y0, y1) in runs {
            let line = Line::new(origin + Point::new(dx, y0), origin + Point::new(dx, y1));
            paint(frame, &line.into_styled(style));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::{ArtRequest, ArtSize};
    use crate::display::color::{PROGRESS, TEXT, TRACK};
    use std::sync::Arc;
    use std::time::Instant;

    fn compositor() -> FrameCompositor {
        FrameCompositor::new(CompactLayout::for_canvas(64, 64))
    }

    fn anim_with(title: &str, artist: &str) -> AnimationState {
        let now = Instant::now();
        let mut anim = AnimationState::new(now);
        anim.set_lines_for_test(title, artist, now);
        anim
    }

    #[test]
    fn test_inactive_is_black() {
        let f = compositor().compose(DisplayMode::Inactive, &anim_with("Song", "Band"), 0.5, true);
        assert!(f.is_blank());
        assert_eq!((f.width(), f.height()), (64, 64));
    }

    #[test]
    fn test_fullscreen_without_art_is_black() {
        let f = compositor().compose(DisplayMode::FullscreenArt, &anim_with("Song", "Band"), 0.5, false);
        assert!(f.is_blank());
    }

    #[test]
    fn test_fullscreen_fills_canvas() {
        let mut anim = anim_with("Song", "Band");
        let req = ArtRequest { url: "u".into(), size: ArtSize::Fullscreen, width: 64, height: 64 };
        anim.set_artwork_for_test(req, Arc::new(RgbImage::from_pixel(64, 64, image::Rgb([9, 8, 7]))));
        let f = compositor().compose(DisplayMode::FullscreenArt, &anim, 0.5, false);
        assert_eq!(f.count(Rgb888::new(9, 8, 7)), 64 * 64);
    }

    #[test]
    fn test_compact_layout_pixels() {
        let mut anim = anim_with("Song", "Band");
        let req = ArtRequest { url: "u".into(), size: ArtSize::Compact, width: 48, height: 48 };
        anim.set_artwork_for_test(req, Arc::new(RgbImage::from_pixel(48, 48, image::Rgb([1, 2, 3]))));
        let f = compositor().compose(DisplayMode::CompactNowPlaying, &anim, 0.5, true);

        let art = Rgb888::new(1, 2, 3);
        assert_eq!(f.pixel(8, 14), Some(art));
        assert_eq!(f.pixel(55, 61), Some(art));
        assert_eq!(f.pixel(7, 14), Some(Rgb888::BLACK));
        assert_eq!(f.count(art), 48 * 48);

        // progress bar: half of 64 filled on both rows
        assert_eq!(f.pixel(0, 62), Some(PROGRESS));
        assert_eq!(f.pixel(31, 63), Some(PROGRESS));
        assert_eq!(f.pixel(32, 62), Some(TRACK));
        assert_eq!(f.pixel(63, 63), Some(TRACK));

        // pause bars while playing
        assert_eq!(f.pixel(55, 3), Some(PROGRESS));
        assert_eq!(f.pixel(56, 9), Some(PROGRESS));
        assert_eq!(f.pixel(57, 5), Some(Rgb888::BLACK));
        assert_eq!(f.pixel(59, 5), Some(PROGRESS));

        // title and artist are drawn, column 0 stays masked
        assert!((0..6).flat_map(|y| (1..52).map(move |x| (x, y))).any(|(x, y)| f.pixel(x, y) == Some(TEXT)));
        assert!((7..13).flat_map(|y| (1..52).map(move |x| (x, y))).any(|(x, y)| f.pixel(x, y) == Some(TEXT)));
        assert!((0..13).all(|y| f.pixel(0, y) == Some(Rgb888::BLACK)));
    }

    #[test]
    fn test_play_glyph_when_paused() {
        let f = compositor().compose(DisplayMode::CompactNowPlaying, &anim_with("Song", "Band"), 0.0, false);
        assert_eq!(f.pixel(55, 3), Some(PROGRESS));
        assert_eq!(f.pixel(55, 9), Some(PROGRESS));
        assert_eq!(f.pixel(60, 6), Some(PROGRESS));
        assert_eq!(f.pixel(60, 5), Some(Rgb888::BLACK));
        // empty progress leaves only the grey track
        assert_eq!(f.count(TRACK), 128);
    }

    #[test]
    fn test_long_title_masked_at_header_block() {
        let anim = anim_with("An Exceptionally Long Song Title Indeed", "Band");
        let f = compositor().compose(DisplayMode::CompactNowPlaying, &anim, 0.0, false);
        for y in 0..6 {
            for x in 52..64 {
                assert_ne!(f.pixel(x, y), Some(TEXT), "text leaked at {},{}", x, y);
            }
        }
    }
}
