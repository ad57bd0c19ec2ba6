/*
 *  artwork/http.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  HTTP artwork download and decode
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

use image::DynamicImage;
use log::trace;
use reqwest::{Client, header};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::artwork::{ArtworkError, ArtworkFetcher};

const USER_AGENT: &str = concat!("LyMatrix v", env!("CARGO_PKG_VERSION"));

/// Fetches over HTTP on the shared tokio runtime.
///
/// `fetch_and_decode` blocks the calling thread, so it belongs on the
/// artwork worker thread, never on a runtime thread.
pub struct HttpArtworkFetcher {
    client: Client,
    runtime: Handle,
}

impl HttpArtworkFetcher {
    pub fn new(runtime: Handle) -> Result<Self, ArtworkError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("image/*"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, runtime })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ArtworkError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        trace!("Fetched {} bytes of artwork from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

impl ArtworkFetcher for HttpArtworkFetcher {
    fn fetch_and_decode(&self, url: &str) -> Result<DynamicImage, ArtworkError> {
        if url.is_empty() {
            return Err(ArtworkError::EmptyUrl);
        }
        let bytes = self.runtime.block_on(self.download(url))?;
        Ok(image::load_from_memory(&bytes)?)
    }
}
