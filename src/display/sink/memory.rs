/*
 *  display/sink/memory.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory sink that records frames for inspection
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

use std::sync::{Arc, Mutex, PoisonError};

use crate::display::error::SinkError;
use crate::display::frame::Frame;
use crate::display::sink::DisplaySink;

/// Records pushed frames without touching hardware.
///
/// Clones share state, so a test can keep one handle while the render loop
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

/// Shared state for the memory sink.
#[derive(Debug, Default)]
pub struct MemorySinkState {
    /// Number of successful pushes
    pub push_count: usize,

    /// Most recent frame
    pub last_frame: Option<Frame>,

    /// Every frame, only kept when `keep_history` is set
    pub history: Vec<Frame>,
    pub keep_history: bool,

    /// Simulate failures (for error testing)
    pub simulate_failure: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history() -> Self {
        let sink = Self::default();
        sink.with_state(|s| s.keep_history = true);
        sink
    }

    /// Run `f` against the shared state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MemorySinkState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn push_count(&self) -> usize {
        self.with_state(|s| s.push_count)
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.with_state(|s| s.last_frame.clone())
    }

    pub fn history(&self) -> Vec<Frame> {
        self.with_state(|s| s.history.clone())
    }

    pub fn set_failure(&self, fail: bool) {
        self.with_state(|s| s.simulate_failure = fail);
    }
}

impl DisplaySink for MemorySink {
    fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.with_state(|s| {
            if s.simulate_failure {
                return Err(SinkError::Other("simulated push failure".into()));
            }
            s.push_count += 1;
            if s.keep_history {
                s.history.push(frame.clone());
            }
            s.last_frame = Some(frame.clone());
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
