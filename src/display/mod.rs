/*
 *  display/mod.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display pipeline: state machine, compositor, frame and sinks
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

pub mod color;
pub mod compositor;
pub mod error;
pub mod frame;
pub mod layout;
pub mod scroller;
pub mod sink;
pub mod state_machine;

pub use color::Palette;
pub use compositor::FrameCompositor;
pub use error::SinkError;
pub use frame::Frame;
pub use layout::CompactLayout;
pub use scroller::ScrollState;
pub use sink::{DisplaySink, FlaschenSink, MemorySink, NullSink};
pub use state_machine::{AnimationState, DisplayStateMachine, MachineConfig};

/// What the screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    /// Nothing playing, screen dark
    #[default]
    Inactive,
    /// Artwork thumbnail, scrolling title and artist, progress bar
    CompactNowPlaying,
    /// Artwork over the whole canvas
    FullscreenArt,
}
