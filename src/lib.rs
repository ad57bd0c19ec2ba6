/*
 *  lib.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root, the binary in main.rs wires these together
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

pub mod artwork;
pub mod config;
pub mod display;
pub mod mailbox;
pub mod playback;
pub mod poller;
pub mod render;
pub mod sources;

pub use artwork::{ArtRequest, ArtSize, ArtworkCache, ArtworkError, ArtworkFetcher, ArtworkProvider, Bitmap};
pub use display::{AnimationState, DisplayMode, DisplayStateMachine, Frame, FrameCompositor, MachineConfig};
pub use mailbox::{mailbox, MailboxReader, MailboxWriter};
pub use playback::{PlaybackSnapshot, PlaybackSource, PlaybackUpdate, SourceError};
pub use poller::{PlaybackPoller, PollerConfig};
pub use render::{RenderConfig, RenderLoop};
