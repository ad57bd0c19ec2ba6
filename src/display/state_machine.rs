/*
 *  display/state_machine.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-tick display mode decisions, scroll and pause timers
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

use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::artwork::{ArtRequest, ArtSize, ArtworkProvider, Bitmap};
use crate::display::DisplayMode;
use crate::display::layout::CompactLayout;
use crate::display::scroller::ScrollState;
use crate::mailbox::MailboxReader;
use crate::playback::{PlaybackSnapshot, PlaybackUpdate};

/// Minimum wait before asking again for artwork that just failed
pub const ARTWORK_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Always show artwork fullscreen, never the compact screen
    pub full_screen_always: bool,
    /// How long playback must stay paused before going fullscreen
    pub pause_delay: Duration,
    /// How long a line sits still before it starts to scroll
    pub scroll_delay: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            full_screen_always: false,
            pause_delay: Duration::from_secs(5),
            scroll_delay: Duration::from_secs(4),
        }
    }
}

/// Everything the compositor needs besides the mode.
///
/// `artwork` is either `None` or the bitmap for `artwork_url` at
/// `artwork_size`; the three are only ever set together.
#[derive(Debug, Clone)]
pub struct AnimationState {
    title: ScrollState,
    artist: ScrollState,
    is_playing: bool,
    is_paused: bool,
    paused_since: Instant,
    artwork_url: String,
    artwork: Option<Bitmap>,
    artwork_size: ArtSize,
}

impl AnimationState {
    pub fn new(now: Instant) -> Self {
        Self {
            title: ScrollState::new(now),
            artist: ScrollState::new(now),
            is_playing: false,
            is_paused: true,
            paused_since: now,
            artwork_url: String::new(),
            artwork: None,
            artwork_size: ArtSize::Compact,
        }
    }

    pub fn title(&self) -> &ScrollState { &self.title }
    pub fn artist(&self) -> &ScrollState { &self.artist }
    pub fn current_title(&self) -> &str { self.title.text() }
    pub fn current_artist(&self) -> &str { self.artist.text() }
    pub fn title_offset(&self) -> u32 { self.title.offset() }
    pub fn artist_offset(&self) -> u32 { self.artist.offset() }
    pub fn is_playing(&self) -> bool { self.is_playing }
    pub fn is_paused(&self) -> bool { self.is_paused }
    pub fn paused_since(&self) -> Instant { self.paused_since }
    pub fn artwork_url(&self) -> &str { &self.artwork_url }
    pub fn artwork(&self) -> Option<&Bitmap> { self.artwork.as_ref() }
    pub fn artwork_size(&self) -> ArtSize { self.artwork_size }

    fn reset_scrollers(&mut self, now: Instant) {
        self.title.reset(now);
        self.artist.reset(now);
    }

    fn clear_artwork(&mut self) {
        self.artwork_url.clear();
        self.artwork = None;
    }

    fn holds(&self, request: &ArtRequest) -> bool {
        self.artwork.is_some() && self.artwork_url == request.url && self.artwork_size == request.size
    }

    fn adopt_artwork(&mut self, request: ArtRequest, bitmap: Bitmap) {
        self.artwork_url = request.url;
        self.artwork_size = request.size;
        self.artwork = Some(bitmap);
    }

    #[cfg(test)]
    pub(crate) fn set_lines_for_test(&mut self, title: &str, artist: &str, now: Instant) {
        self.title.set_text(title, now);
        self.artist.set_text(artist, now);
    }

    #[cfg(test)]
    pub(crate) fn set_artwork_for_test(&mut self, request: ArtRequest, bitmap: Bitmap) {
        self.adopt_artwork(request, bitmap);
    }
}

/// Owns the animation state and decides the display mode once per tick.
pub struct DisplayStateMachine {
    config: MachineConfig,
    layout: CompactLayout,
    updates: MailboxReader<PlaybackUpdate>,
    artwork: Box<dyn ArtworkProvider>,
    snapshot: Option<PlaybackSnapshot>,
    mode: DisplayMode,
    anim: AnimationState,
    progress: f32,
    last_art_url: String,
    desired_art: Option<ArtRequest>,
    pending_art: Option<ArtRequest>,
    failed_art: Option<(ArtRequest, Instant)>,
}

impl DisplayStateMachine {
    pub fn new(
        config: MachineConfig,
        layout: CompactLayout,
        updates: MailboxReader<PlaybackUpdate>,
        artwork: Box<dyn ArtworkProvider>,
        now: Instant,
    ) -> Self {
        Self {
            config,
            layout,
            updates,
            artwork,
            snapshot: None,
            mode: DisplayMode::Inactive,
            anim: AnimationState::new(now),
            progress: 0.0,
            last_art_url: String::new(),
            desired_art: None,
            pending_art: None,
            failed_art: None,
        }
    }

    pub fn mode(&self) -> DisplayMode { self.mode }
    pub fn animation(&self) -> &AnimationState { &self.anim }
    pub fn progress_fraction(&self) -> f32 { self.progress }
    pub fn is_playing(&self) -> bool { self.anim.is_playing }
    pub fn layout(&self) -> &CompactLayout { &self.layout }
    pub fn config(&self) -> &MachineConfig { &self.config }

    /// Advance one render tick and return the mode to draw.
    pub fn tick(&mut self, now: Instant) -> DisplayMode {
        if let Some(update) = self.updates.take() {
            self.snapshot = match update {
                PlaybackUpdate::Active(s) if s.is_valid() => Some(s),
                _ => None,
            };
        }

        self.collect_artwork(now);
        let next = match self.snapshot.take() {
            None => {
                self.enter_inactive(now);
                DisplayMode::Inactive
            }
            Some(snapshot) => {
                let mode = self.advance(&snapshot, now);
                self.snapshot = Some(snapshot);
                mode
            }
        };
        // providers that resolve inline have an answer already
        self.collect_artwork(now);

        if next != self.mode {
            info!("Display mode changed: {:?} -> {:?}", self.mode, next);
            self.mode = next;
        }
        next
    }

    fn enter_inactive(&mut self, now: Instant) {
        self.anim.title.clear(now);
        self.anim.artist.clear(now);
        self.anim.clear_artwork();
        self.anim.is_playing = false;
        self.anim.is_paused = true;
        self.anim.paused_since = now;
        self.progress = 0.0;
        self.last_art_url.clear();
        self.desired_art = None;
        self.pending_art = None;
        self.failed_art = None;
    }

    fn advance(&mut self, snap: &PlaybackSnapshot, now: Instant) -> DisplayMode {
        if self.mode == DisplayMode::Inactive {
            debug!("Now playing {} - {}", snap.artist, snap.title);
            self.anim.title.set_text(&snap.title, now);
            self.anim.artist.set_text(&snap.artist, now);
            self.anim.reset_scrollers(now);
            self.anim.clear_artwork();
            self.anim.paused_since = now;
            self.last_art_url = snap.artwork_url.clone();
        }

        self.anim.is_playing = snap.is_playing;
        self.progress = snap.progress_fraction();

        let track_changed =
            self.anim.title.text() != snap.title || self.anim.artist.text() != snap.artist;
        if track_changed {
            debug!("Track changed to {} - {}", snap.artist, snap.title);
            self.anim.title.set_text(&snap.title, now);
            self.anim.artist.set_text(&snap.artist, now);
            self.anim.reset_scrollers(now);
        }

        if self.config.full_screen_always {
            self.want_artwork(&snap.artwork_url, ArtSize::Fullscreen, now);
            return DisplayMode::FullscreenArt;
        }

        if !snap.is_playing {
            if !self.anim.is_paused {
                self.anim.is_paused = true;
                self.anim.paused_since = now;
            }
        } else {
            if self.anim.is_paused
                && self.anim.artwork.is_some()
                && self.anim.artwork_size == ArtSize::Compact
            {
                self.anim.reset_scrollers(now);
            }
            self.anim.is_paused = false;
        }

        let art_changed = snap.artwork_url != self.last_art_url;
        if art_changed {
            self.last_art_url = snap.artwork_url.clone();
        }
        if self.anim.is_paused && (art_changed || track_changed) {
            // new track while paused shows compact first
            self.anim.paused_since = now;
        }

        let show_fullscreen = self.anim.is_paused
            && now.saturating_duration_since(self.anim.paused_since) >= self.config.pause_delay;

        if show_fullscreen {
            self.want_artwork(&snap.artwork_url, ArtSize::Fullscreen, now);
            return DisplayMode::FullscreenArt;
        }

        self.want_artwork(&snap.artwork_url, ArtSize::Compact, now);

        let line_width = self.layout.line_width;
        let delay = self.config.scroll_delay;
        let freeze_title = self.anim.title.offset() == 0 && self.anim.artist.offset() > 0;
        let freeze_artist = self.anim.artist.offset() == 0 && self.anim.title.offset() > 0;
        self.anim.title.advance(now, line_width, delay, freeze_title);
        self.anim.artist.advance(now, line_width, delay, freeze_artist);

        DisplayMode::CompactNowPlaying
    }

    fn want_artwork(&mut self, url: &str, size: ArtSize, now: Instant) {
        if url.is_empty() {
            self.anim.clear_artwork();
            self.desired_art = None;
            return;
        }
        let (width, height) = self.layout.art_dims(size);
        let request = ArtRequest { url: url.to_string(), size, width, height };
        self.desired_art = Some(request.clone());

        if self.anim.holds(&request) || self.pending_art.as_ref() == Some(&request) {
            return;
        }
        if let Some((failed, at)) = &self.failed_art {
            if *failed == request && now.saturating_duration_since(*at) < ARTWORK_RETRY_DELAY {
                return;
            }
        }
        debug!("Requesting {:?} artwork {}", size, url);
        self.pending_art = Some(request.clone());
        self.artwork.request(request);
    }

    fn collect_artwork(&mut self, now: Instant) {
        while let Some(outcome) = self.artwork.poll() {
            if self.pending_art.as_ref() == Some(&outcome.request) {
                self.pending_art = None;
            }
            match outcome.result {
                Ok(bitmap) if self.desired_art.as_ref() == Some(&outcome.request) => {
                    self.failed_art = None;
                    self.anim.adopt_artwork(outcome.request, bitmap);
                }
                Ok(_) => debug!("Discarding superseded artwork {}", outcome.request.url),
                Err(e) => {
                    // keep whatever bitmap is on screen
                    warn!("Artwork {} failed: {}", outcome.request.url, e);
                    self.failed_art = Some((outcome.request, now));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::InlineArtwork;
    use crate::artwork::testing::SolidFetcher;
    use crate::mailbox::{MailboxWriter, mailbox};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    const TICK: Duration = Duration::from_millis(80);

    fn snap(title: &str, artist: &str, url: &str, playing: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            artist: artist.into(),
            title: title.into(),
            artwork_url: url.into(),
            is_playing: playing,
            progress_ms: 30_000,
            duration_ms: 120_000,
        }
    }

    fn machine(
        config: MachineConfig,
        now: Instant,
    ) -> (DisplayStateMachine, MailboxWriter<PlaybackUpdate>, Arc<SolidFetcher>) {
        let fetcher = Arc::new(SolidFetcher::default());
        let (writer, reader) = mailbox();
        let m = DisplayStateMachine::new(
            config,
            CompactLayout::for_canvas(64, 64),
            reader,
            Box::new(InlineArtwork::new(Arc::clone(&fetcher))),
            now,
        );
        (m, writer, fetcher)
    }

    #[test]
    fn test_starts_inactive() {
        let t0 = Instant::now();
        let (mut m, _w, _f) = machine(MachineConfig::default(), t0);
        assert_eq!(m.tick(t0), DisplayMode::Inactive);
        assert!(m.animation().artwork().is_none());
        assert_eq!(m.progress_fraction(), 0.0);
    }

    #[test]
    fn test_active_snapshot_enters_compact_with_art() {
        let t0 = Instant::now();
        let (mut m, w, _f) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", true)));
        assert_eq!(m.tick(t0), DisplayMode::CompactNowPlaying);
        let anim = m.animation();
        assert_eq!(anim.current_title(), "Song");
        assert_eq!(anim.artwork_url(), "http://art/1");
        assert_eq!(anim.artwork_size(), ArtSize::Compact);
        assert_eq!(anim.artwork().map(|b| b.dimensions()), Some((48, 48)));
        assert_eq!(m.progress_fraction(), 0.25);
    }

    #[test]
    fn test_invalid_snapshot_goes_inactive() {
        let t0 = Instant::now();
        let (mut m, w, _f) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", true)));
        m.tick(t0);
        w.publish(PlaybackUpdate::Active(snap("", "Band", "http://art/1", true)));
        assert_eq!(m.tick(t0 + TICK), DisplayMode::Inactive);
        assert_eq!(m.animation().artwork_url(), "");
        assert!(m.animation().artwork().is_none());
        assert!(m.animation().is_paused());
    }

    #[test]
    fn test_full_screen_always() {
        let t0 = Instant::now();
        let config = MachineConfig { full_screen_always: true, ..Default::default() };
        let (mut m, w, _f) = machine(config, t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", true)));
        assert_eq!(m.tick(t0), DisplayMode::FullscreenArt);
        assert_eq!(m.animation().artwork_size(), ArtSize::Fullscreen);
        assert_eq!(m.animation().artwork().map(|b| b.dimensions()), Some((64, 64)));
    }

    #[test]
    fn test_new_art_while_paused_restarts_pause_timer() {
        let t0 = Instant::now();
        let (mut m, w, _f) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", false)));
        m.tick(t0);
        assert_eq!(m.tick(t0 + Duration::from_secs(6)), DisplayMode::FullscreenArt);

        let t1 = t0 + Duration::from_secs(7);
        w.publish(PlaybackUpdate::Active(snap("Other", "Band", "http://art/2", false)));
        assert_eq!(m.tick(t1), DisplayMode::CompactNowPlaying);
        assert_eq!(m.animation().paused_since(), t1);
        assert_eq!(m.animation().artwork_url(), "http://art/2");
        assert_eq!(m.tick(t1 + Duration::from_secs(5)), DisplayMode::FullscreenArt);
    }

    #[test]
    fn test_resume_resets_scrollers() {
        let t0 = Instant::now();
        let title = "A Title Long Enough To Need Scrolling";
        let (mut m, w, _f) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap(title, "Band", "http://art/1", true)));
        let mut now = t0;
        for _ in 0..60 {
            now += TICK;
            m.tick(now);
        }
        assert!(m.animation().title_offset() > 0);

        w.publish(PlaybackUpdate::Active(snap(title, "Band", "http://art/1", false)));
        now += TICK;
        m.tick(now);
        w.publish(PlaybackUpdate::Active(snap(title, "Band", "http://art/1", true)));
        now += TICK;
        m.tick(now);
        assert_eq!(m.animation().title_offset(), 0);
        assert_eq!(m.animation().title().last_reset(), now);
    }

    #[test]
    fn test_shorter_line_waits_for_longer_one() {
        let t0 = Instant::now();
        let title = "Forty Character Title For The Scroll Run";
        let artist = "Twenty Char Artist A";
        assert_eq!((title.len(), artist.len()), (40, 20));

        let (mut m, w, _f) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap(title, artist, "http://art/1", true)));

        let mut offsets = Vec::new();
        let mut resets = Vec::new();
        for i in 0..=320u32 {
            m.tick(t0 + TICK * i);
            let anim = m.animation();
            offsets.push((anim.title_offset(), anim.artist_offset()));
            resets.push((anim.title().last_reset(), anim.artist().last_reset()));
        }

        // both sit out the scroll delay, then move together
        assert_eq!(offsets[49], (0, 0));
        assert_eq!(offsets[100], (51, 51));

        // the artist wrapped first and is pinned until the title wraps
        assert_eq!(offsets[200], (151, 0));
        let title_wrap = (150..offsets.len())
            .find(|&i| offsets[i].0 == 0)
            .expect("title never wrapped");
        assert!(offsets[150..title_wrap].iter().all(|&(t, a)| t > 0 && a == 0));

        // both restart from the same instant and scroll in step again
        let wrap_at = t0 + TICK * title_wrap as u32;
        assert_eq!(offsets[title_wrap], (0, 0));
        assert_eq!(resets[title_wrap], (wrap_at, wrap_at));
        let (t, a) = offsets[title_wrap + 70];
        assert!(t > 0);
        assert_eq!(t, a);
    }

    #[test]
    fn test_failed_fetch_retries_after_delay() {
        let t0 = Instant::now();
        let (mut m, w, fetcher) = machine(MachineConfig::default(), t0);
        fetcher.fail.store(true, Ordering::SeqCst);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", true)));
        assert_eq!(m.tick(t0), DisplayMode::CompactNowPlaying);
        assert!(m.animation().artwork().is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        m.tick(t0 + TICK);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        fetcher.fail.store(false, Ordering::SeqCst);
        m.tick(t0 + ARTWORK_RETRY_DELAY + TICK);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(m.animation().artwork().is_some());
    }

    #[test]
    fn test_empty_artwork_url_clears_bitmap() {
        let t0 = Instant::now();
        let (mut m, w, fetcher) = machine(MachineConfig::default(), t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "http://art/1", true)));
        m.tick(t0);
        w.publish(PlaybackUpdate::Active(snap("Song", "Band", "", true)));
        m.tick(t0 + TICK);
        assert!(m.animation().artwork().is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
