/*
 *  artwork/mod.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Album artwork resolution: fetch, decode, resize, cache one bitmap
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

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use log::debug;
use std::sync::Arc;
use thiserror::Error;

pub mod http;
pub mod worker;

pub use http::HttpArtworkFetcher;
pub use worker::{ArtworkWorker, InlineArtwork};

/// Decoded artwork, shared between the cache and the animation state.
pub type Bitmap = Arc<RgbImage>;

/// Which layout slot a bitmap was sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtSize {
    Compact,
    Fullscreen,
}

/// A (url, size) key, the unit the cache and worker deal in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtRequest {
    pub url: String,
    pub size: ArtSize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("artwork fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("artwork decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("artwork URL is empty")]
    EmptyUrl,
    #[error("invalid artwork size {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("artwork worker unavailable")]
    WorkerGone,
    #[error("artwork fetch panicked")]
    FetchPanicked,
}

/// Download and decode the bytes behind an artwork URL.
pub trait ArtworkFetcher: Send {
    fn fetch_and_decode(&self, url: &str) -> Result<DynamicImage, ArtworkError>;
}

impl<F: ArtworkFetcher + Sync + ?Sized> ArtworkFetcher for Arc<F> {
    fn fetch_and_decode(&self, url: &str) -> Result<DynamicImage, ArtworkError> {
        (**self).fetch_and_decode(url)
    }
}

/// Resize to exactly `width` x `height`.
pub fn resize_artwork(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        return image.to_rgb8();
    }
    image.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
}

struct CacheEntry {
    url: String,
    width: u32,
    height: u32,
    bitmap: Bitmap,
}

/// Holds at most one resized bitmap, keyed by (url, width, height).
pub struct ArtworkCache<F> {
    fetcher: F,
    entry: Option<CacheEntry>,
    fetches: u64,
}

impl<F: ArtworkFetcher> ArtworkCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher, entry: None, fetches: 0 }
    }

    /// Return the bitmap for `url` at `width` x `height`, fetching only on a miss.
    ///
    /// A miss discards the previous entry before fetching, so a failed fetch
    /// leaves the cache empty.
    pub fn resolve(&mut self, url: &str, width: u32, height: u32) -> Result<Bitmap, ArtworkError> {
        if url.is_empty() {
            return Err(ArtworkError::EmptyUrl);
        }
        if width == 0 || height == 0 {
            return Err(ArtworkError::InvalidSize(width, height));
        }
        if let Some(entry) = &self.entry {
            if entry.url == url && entry.width == width && entry.height == height {
                return Ok(Arc::clone(&entry.bitmap));
            }
        }

        self.entry = None;
        self.fetches += 1;
        debug!("Fetching artwork {} at {}x{}", url, width, height);
        let image = self.fetcher.fetch_and_decode(url)?;
        let bitmap = Arc::new(resize_artwork(&image, width, height));
        self.entry = Some(CacheEntry {
            url: url.to_string(),
            width,
            height,
            bitmap: Arc::clone(&bitmap),
        });
        Ok(bitmap)
    }

    /// Number of fetches performed, hits excluded.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    pub fn is_cached(&self, url: &str, width: u32, height: u32) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.url == url && e.width == width && e.height == height)
    }
}

/// The result of one artwork request.
#[derive(Debug)]
pub struct ArtworkOutcome {
    pub request: ArtRequest,
    pub result: Result<Bitmap, ArtworkError>,
}

/// The state machine's view of artwork resolution: fire a request, collect
/// completions later, never wait.
pub trait ArtworkProvider: Send {
    fn request(&mut self, request: ArtRequest);
    fn poll(&mut self) -> Option<ArtworkOutcome>;
}
