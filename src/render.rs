/*
 *  render.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed cadence render loop with idle blanking
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

use log::{debug, info, trace, warn};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

use crate::display::{DisplayMode, DisplaySink, DisplayStateMachine, Frame, FrameCompositor};

/// Consecutive sink failures logged at warn before going quiet
const SINK_WARN_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Render period
    pub tick: Duration,
    /// Blank the panel after this long without playback
    pub shutdown_delay: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(80),
            shutdown_delay: Duration::from_secs(600),
        }
    }
}

/// Tracks when playback was last seen and says when to go dark.
#[derive(Debug, Clone)]
pub struct IdleBlanker {
    last_active: Instant,
    delay: Duration,
    blanked: bool,
}

impl IdleBlanker {
    pub fn new(now: Instant, delay: Duration) -> Self {
        Self { last_active: now, delay, blanked: false }
    }

    /// True when the frame should be replaced by black.
    pub fn apply(&mut self, now: Instant, is_playing: bool) -> bool {
        if is_playing {
            self.last_active = now;
        }
        let blank = !is_playing && now.saturating_duration_since(self.last_active) >= self.delay;
        if blank != self.blanked {
            if blank {
                info!("No playback for {:?}, blanking display", self.delay);
            } else {
                info!("Playback resumed, display awake");
            }
            self.blanked = blank;
        }
        blank
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }
}

/// Drives the state machine, compositor and sink once per tick.
pub struct RenderLoop<S: DisplaySink> {
    machine: DisplayStateMachine,
    compositor: FrameCompositor,
    sink: S,
    blanker: IdleBlanker,
    config: RenderConfig,
    sink_failures: u32,
}

impl<S: DisplaySink> RenderLoop<S> {
    pub fn new(
        machine: DisplayStateMachine,
        compositor: FrameCompositor,
        sink: S,
        config: RenderConfig,
        now: Instant,
    ) -> Self {
        Self {
            machine,
            compositor,
            sink,
            blanker: IdleBlanker::new(now, config.shutdown_delay),
            config,
            sink_failures: 0,
        }
    }

    pub fn machine(&self) -> &DisplayStateMachine { &self.machine }
    pub fn sink(&self) -> &S { &self.sink }
    pub fn sink_mut(&mut self) -> &mut S { &mut self.sink }

    /// Tick the state machine and build the frame to show at `now`.
    pub fn next_frame(&mut self, now: Instant) -> Frame {
        let mode = self.machine.tick(now);
        let frame = self.compositor.compose(
            mode,
            self.machine.animation(),
            self.machine.progress_fraction(),
            self.machine.is_playing(),
        );
        let idle = self.blanker.apply(now, self.machine.is_playing());
        if mode == DisplayMode::Inactive || idle {
            return self.compositor.blank();
        }
        frame
    }

    /// One full tick: compose and push. Sink failures are logged and the
    /// loop carries on.
    pub fn step(&mut self, now: Instant) {
        let frame = self.next_frame(now);
        match self.sink.push(&frame) {
            Ok(()) => {
                if self.sink_failures > 0 {
                    info!("Sink {} recovered after {} failures", self.sink.name(), self.sink_failures);
                }
                self.sink_failures = 0;
                trace!("Pushed frame to {}", self.sink.name());
            }
            Err(e) => {
                self.sink_failures += 1;
                if self.sink_failures <= SINK_WARN_LIMIT {
                    warn!("Sink {} push failed: {}", self.sink.name(), e);
                } else {
                    debug!("Sink {} push failed: {}", self.sink.name(), e);
                }
            }
        }
    }

    /// Run until `shutdown` resolves, then hand the sink back.
    pub async fn run<F>(mut self, shutdown: F) -> S
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Render loop running every {:?}", self.config.tick);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.step(Instant::now()),
                _ = &mut shutdown => {
                    info!("Render loop stopping");
                    break;
                }
            }
        }
        self.sink
    }
}
