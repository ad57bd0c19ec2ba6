/*
 *  poller.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Background playback polling, publishes into the playback mailbox
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

use std::time::Duration;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::mailbox::MailboxWriter;
use crate::playback::{PlaybackSource, PlaybackUpdate};

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Time between polls
    pub interval: Duration,
    /// Grace period before the first poll
    pub startup_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            startup_delay: Duration::from_secs(3),
        }
    }
}

/// Owns the polling task. Dropping it signals the task to stop.
#[derive(Debug)]
pub struct PlaybackPoller {
    stop_sender: Option<mpsc::Sender<()>>,
    poll_handle: Option<JoinHandle<()>>,
}

impl PlaybackPoller {
    /// Spawn the polling task on the current tokio runtime.
    pub fn spawn<S>(mut source: S, writer: MailboxWriter<PlaybackUpdate>, config: PollerConfig) -> Self
    where
        S: PlaybackSource + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let poll_handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(config.startup_delay) => {}
                _ = rx.recv() => {
                    debug!("Playback poller stopped before first poll");
                    return;
                }
            }

            let mut ticker = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Playback poller running every {:?}", config.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = rx.recv() => {
                        debug!("Playback poller received stop signal. Exiting.");
                        break;
                    }
                }

                // a slow source (discovery, HTTP timeouts) must not delay a stop
                let result = tokio::select! {
                    result = source.poll() => result,
                    _ = rx.recv() => {
                        debug!("Playback poller stopped mid-poll. Exiting.");
                        break;
                    }
                };
                match result {
                    Ok(update) => {
                        debug!("Playback update: active={}", update.is_active());
                        writer.publish(update);
                    }
                    // stale data is fine, try again next cycle
                    Err(e) => warn!("Playback poll failed: {}", e),
                }
            }
        });

        Self {
            stop_sender: Some(tx),
            poll_handle: Some(poll_handle),
        }
    }

    /// Stop the task and wait for it to wind down.
    pub async fn stop(mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(()).await;
        }
        if let Some(handle) = self.poll_handle.take() {
            if let Err(e) = handle.await {
                error!("Playback poller ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.poll_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PlaybackPoller {
    fn drop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            // non-blocking, the runtime reaps the detached task
            if let Err(e) = sender.try_send(()) {
                debug!("Playback poller already stopping: {}", e);
            }
        }
    }
}
