/*
 *  artwork/worker.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Artwork providers: a background fetch thread and an inline variant
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

use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::artwork::{ArtRequest, ArtworkCache, ArtworkError, ArtworkFetcher, ArtworkOutcome, ArtworkProvider};
use crate::mailbox::{MailboxReader, MailboxWriter, mailbox};

fn resolve_outcome<F: ArtworkFetcher>(cache: &mut ArtworkCache<F>, request: ArtRequest) -> ArtworkOutcome {
    let result = cache.resolve(&request.url, request.width, request.height);
    ArtworkOutcome { request, result }
}

/// Resolves artwork on a dedicated thread so slow fetches never stall a tick.
///
/// Requests queue on a channel, the worker only ever serves the newest one.
/// Completions land in a mailbox, so an unread result is overwritten by the
/// next.
pub struct ArtworkWorker {
    requests: Option<mpsc::Sender<ArtRequest>>,
    completions: MailboxReader<ArtworkOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl ArtworkWorker {
    pub fn spawn<F>(fetcher: F) -> std::io::Result<Self>
    where
        F: ArtworkFetcher + 'static,
    {
        let (tx, rx) = mpsc::channel::<ArtRequest>();
        let (writer, reader) = mailbox();

        let handle = thread::Builder::new()
            .name("artwork".into())
            .spawn(move || run_worker(ArtworkCache::new(fetcher), rx, writer))?;

        Ok(Self {
            requests: Some(tx),
            completions: reader,
            handle: Some(handle),
        })
    }
}

fn run_worker<F: ArtworkFetcher>(
    mut cache: ArtworkCache<F>,
    rx: mpsc::Receiver<ArtRequest>,
    writer: MailboxWriter<ArtworkOutcome>,
) {
    info!("Artwork worker started");
    while let Ok(mut request) = rx.recv() {
        // collapse the backlog, only the latest request matters
        while let Ok(newer) = rx.try_recv() {
            debug!("Skipping superseded artwork request {}", request.url);
            request = newer;
        }
        // answer even when the fetcher panics
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| resolve_outcome(&mut cache, request.clone())));
        let outcome = attempt.unwrap_or_else(|_| {
            error!("Artwork fetch for {} panicked", request.url);
            ArtworkOutcome { request, result: Err(ArtworkError::FetchPanicked) }
        });
        if let Err(e) = &outcome.result {
            warn!("Artwork {} unavailable: {}", outcome.request.url, e);
        }
        writer.publish(outcome);
    }
    info!("Artwork worker stopped");
}

impl ArtworkProvider for ArtworkWorker {
    fn request(&mut self, request: ArtRequest) {
        let Some(tx) = &self.requests else {
            return;
        };
        if let Err(mpsc::SendError(request)) = tx.send(request) {
            warn!("Artwork worker is gone, dropping request for {}", request.url);
            self.requests = None;
            self.report_worker_gone(request);
        }
    }

    fn poll(&mut self) -> Option<ArtworkOutcome> {
        self.completions.take()
    }
}

impl ArtworkWorker {
    // report the dead worker through the normal completion path, once
    fn report_worker_gone(&mut self, request: ArtRequest) {
        let (writer, reader) = mailbox();
        writer.publish(ArtworkOutcome { request, result: Err(ArtworkError::WorkerGone) });
        self.completions = reader;
    }
}

impl Drop for ArtworkWorker {
    fn drop(&mut self) {
        // closing the channel ends the worker loop once any fetch in flight returns
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!("Artwork worker busy, detaching");
                return;
            }
            if handle.join().is_err() {
                warn!("Artwork worker panicked");
            }
        }
    }
}

/// Resolves on the calling thread. Deterministic, used for tests and
/// for sources whose artwork is already local.
pub struct InlineArtwork<F> {
    cache: ArtworkCache<F>,
    pending: Option<ArtworkOutcome>,
}

impl<F: ArtworkFetcher> InlineArtwork<F> {
    pub fn new(fetcher: F) -> Self {
        Self { cache: ArtworkCache::new(fetcher), pending: None }
    }

    pub fn fetch_count(&self) -> u64 {
        self.cache.fetch_count()
    }
}

impl<F: ArtworkFetcher> ArtworkProvider for InlineArtwork<F> {
    fn request(&mut self, request: ArtRequest) {
        self.pending = Some(resolve_outcome(&mut self.cache, request));
    }

    fn poll(&mut self) -> Option<ArtworkOutcome> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::ArtSize;
    use crate::artwork::testing::SolidFetcher;
    use image::{DynamicImage, RgbImage};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn req(url: &str, size: ArtSize, w: u32) -> ArtRequest {
        ArtRequest { url: url.into(), size, width: w, height: w }
    }

    fn wait_for(worker: &mut ArtworkWorker) -> ArtworkOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = worker.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "artwork worker never answered");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_worker_resolves_request() {
        let fetcher = Arc::new(SolidFetcher::default());
        let mut worker = ArtworkWorker::spawn(Arc::clone(&fetcher)).unwrap();
        worker.request(req("http://art/1", ArtSize::Compact, 48));
        let outcome = wait_for(&mut worker);
        assert_eq!(outcome.request.url, "http://art/1");
        assert_eq!(outcome.result.unwrap().dimensions(), (48, 48));
    }

    #[test]
    fn test_worker_reports_failure() {
        let fetcher = Arc::new(SolidFetcher::default());
        fetcher.fail.store(true, Ordering::SeqCst);
        let mut worker = ArtworkWorker::spawn(Arc::clone(&fetcher)).unwrap();
        worker.request(req("http://art/bad", ArtSize::Fullscreen, 64));
        assert!(wait_for(&mut worker).result.is_err());
    }

    /// Panics on the first fetch, serves a solid image after that.
    #[derive(Default)]
    struct PanicOnceFetcher {
        calls: AtomicUsize,
    }

    impl ArtworkFetcher for PanicOnceFetcher {
        fn fetch_and_decode(&self, url: &str) -> Result<DynamicImage, ArtworkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("decoder blew up on {}", url);
            }
            Ok(DynamicImage::ImageRgb8(RgbImage::new(10, 10)))
        }
    }

    #[test]
    fn test_worker_survives_fetch_panic() {
        let fetcher = Arc::new(PanicOnceFetcher::default());
        let mut worker = ArtworkWorker::spawn(Arc::clone(&fetcher)).unwrap();

        worker.request(req("http://art/1", ArtSize::Compact, 48));
        let first = wait_for(&mut worker);
        assert_eq!(first.request.url, "http://art/1");
        assert!(matches!(first.result, Err(ArtworkError::FetchPanicked)));

        worker.request(req("http://art/1", ArtSize::Compact, 48));
        let second = wait_for(&mut worker);
        assert_eq!(second.result.unwrap().dimensions(), (48, 48));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    /// Holds every fetch for a while, like a slow server.
    struct SlowFetcher;

    impl ArtworkFetcher for SlowFetcher {
        fn fetch_and_decode(&self, _url: &str) -> Result<DynamicImage, ArtworkError> {
            thread::sleep(Duration::from_secs(3));
            Ok(DynamicImage::ImageRgb8(RgbImage::new(10, 10)))
        }
    }

    #[test]
    fn test_drop_does_not_wait_for_fetch_in_flight() {
        let mut worker = ArtworkWorker::spawn(SlowFetcher).unwrap();
        worker.request(req("http://art/slow", ArtSize::Fullscreen, 64));
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        drop(worker);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_inline_provider_caches() {
        let fetcher = Arc::new(SolidFetcher::default());
        let mut inline = InlineArtwork::new(Arc::clone(&fetcher));
        inline.request(req("http://art/1", ArtSize::Compact, 48));
        assert!(inline.poll().unwrap().result.is_ok());
        assert!(inline.poll().is_none());
        inline.request(req("http://art/1", ArtSize::Compact, 48));
        assert!(inline.poll().unwrap().result.is_ok());
        assert_eq!(inline.fetch_count(), 1);
    }
}
