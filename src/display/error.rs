/*
 *  display/error.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Errors raised while pushing frames to a panel
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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame size mismatch: sink is {expected_w}x{expected_h}, frame is {actual_w}x{actual_h}")]
    SizeMismatch { expected_w: u32, expected_h: u32, actual_w: u32, actual_h: u32 },

    #[error("frame of {0} bytes does not fit one datagram")]
    FrameTooLarge(usize),

    #[error("{0}")]
    Other(String),
}
