/*
 *  playback.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback snapshot model and the source seam the poller pulls from
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

use std::future::Future;
use thiserror::Error;

use crate::sources::rpc::RpcClientError;

/// One polled sample of playback metadata.
///
/// Snapshots are never merged, each one fully supersedes the last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
    pub artist: String,
    pub title: String,
    pub artwork_url: String,
    pub is_playing: bool,
    pub progress_ms: u64,
    /// 0 when the source does not know the track length
    pub duration_ms: u64,
}

impl PlaybackSnapshot {
    /// Fraction of the track played, in `0.0..=1.0`.
    pub fn progress_fraction(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }

    /// A snapshot without a title carries nothing we can show.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// What the poller publishes into the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackUpdate {
    Active(PlaybackSnapshot),
    /// Nothing is playing, not merely paused
    Inactive,
}

impl PlaybackUpdate {
    /// Invalid snapshots collapse to `Inactive`.
    pub fn from_snapshot(snapshot: Option<PlaybackSnapshot>) -> Self {
        match snapshot {
            Some(s) if s.is_valid() => PlaybackUpdate::Active(s),
            _ => PlaybackUpdate::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackUpdate::Active(_))
    }
}

/// Transient failures raised by a playback source. The poller logs these
/// and tries again on its next cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("LMS request failed: {0}")]
    Rpc(#[from] RpcClientError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server discovery failed: {0}")]
    Discovery(String),
    #[error("source not ready: {0}")]
    NotReady(String),
}

/// Anything that can be asked "what is playing right now".
pub trait PlaybackSource: Send {
    fn poll(&mut self) -> impl Future<Output = Result<PlaybackUpdate, SourceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(progress_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            artist: "Artist".into(),
            title: "Title".into(),
            artwork_url: "http://art/1".into(),
            is_playing: true,
            progress_ms,
            duration_ms,
        }
    }

    #[test]
    fn test_zero_duration_is_zero_progress() {
        assert_eq!(snapshot(0, 0).progress_fraction(), 0.0);
        assert_eq!(snapshot(12_345, 0).progress_fraction(), 0.0);
    }

    #[test]
    fn test_progress_fraction_clamps() {
        assert_eq!(snapshot(50_000, 100_000).progress_fraction(), 0.5);
        assert_eq!(snapshot(150_000, 100_000).progress_fraction(), 1.0);
    }

    #[test]
    fn test_invalid_snapshot_becomes_inactive() {
        let mut s = snapshot(0, 1000);
        s.title = "   ".into();
        assert_eq!(PlaybackUpdate::from_snapshot(Some(s)), PlaybackUpdate::Inactive);
        assert_eq!(PlaybackUpdate::from_snapshot(None), PlaybackUpdate::Inactive);
        assert!(PlaybackUpdate::from_snapshot(Some(snapshot(0, 1000))).is_active());
    }
}
