/*
 *  display/sink/mod.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame sinks, where finished frames go
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

use crate::display::error::SinkError;
use crate::display::frame::Frame;

pub mod flaschen;
pub mod memory;

pub use flaschen::FlaschenSink;
pub use memory::{MemorySink, MemorySinkState};

/// Receives every rendered frame.
///
/// Implementations should not block for long, `push` runs on the render tick.
pub trait DisplaySink: Send {
    fn push(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

impl DisplaySink for Box<dyn DisplaySink> {
    fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
        (**self).push(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Discards frames. Handy for running headless against a live server.
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn push(&mut self, _frame: &Frame) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
