/*
 *  main.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Process entry: config, logging, wiring and graceful shutdown
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

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::time::Instant;
use tokio::signal::unix::{SignalKind, signal};

use lymatrix::artwork::{ArtworkWorker, HttpArtworkFetcher};
use lymatrix::config::{self, Cli, Settings, SinkSettings};
use lymatrix::display::sink::DisplaySink;
use lymatrix::display::{
    CompactLayout, DisplayStateMachine, FlaschenSink, Frame, FrameCompositor, NullSink,
};
use lymatrix::mailbox::mailbox;
use lymatrix::poller::PlaybackPoller;
use lymatrix::render::RenderLoop;
use lymatrix::sources::LmsSource;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn build_sink(settings: &Settings) -> Result<Box<dyn DisplaySink>> {
    Ok(match &settings.sink {
        SinkSettings::Flaschen(ft) => Box::new(
            FlaschenSink::connect(ft.clone(), settings.width, settings.height)
                .with_context(|| format!("connecting to flaschen-taschen at {}:{}", ft.host, ft.port))?,
        ),
        SinkSettings::Null => Box::new(NullSink),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_from(&cli).context("loading configuration")?;

    if cli.dump_config {
        println!("{}", config::to_yaml(&cfg)?);
        return Ok(());
    }

    let settings = Settings::from_config(&cfg)?;

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("LyMatrix v{} built {} for {}", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_TARGET);
    info!(
        "Matrix {}x{}, tick {:?}, fullscreen always {}",
        settings.width, settings.height, settings.render.tick, settings.machine.full_screen_always
    );

    let (writer, reader) = mailbox();
    let source = LmsSource::new(settings.lms.clone()).context("creating LMS client")?;
    let poller = PlaybackPoller::spawn(source, writer, settings.poller);

    let fetcher = HttpArtworkFetcher::new(tokio::runtime::Handle::current())
        .context("creating artwork HTTP client")?;
    let artwork = ArtworkWorker::spawn(fetcher).context("starting artwork worker")?;

    let layout = CompactLayout::for_canvas(settings.width, settings.height);
    let now = Instant::now();
    let machine = DisplayStateMachine::new(settings.machine, layout, reader, Box::new(artwork), now);
    let sink = build_sink(&settings)?;
    let render = RenderLoop::new(machine, FrameCompositor::new(layout), sink, settings.render, now);

    let shutdown = async {
        if let Err(e) = signal_handler().await {
            error!("Signal handler failed: {}", e);
        }
    };
    let mut sink = render.run(shutdown).await;

    // leave the panel dark
    if let Err(e) = sink.push(&Frame::black(settings.width, settings.height)) {
        warn!("Failed to clear display on exit: {}", e);
    }
    poller.stop().await;

    info!("LyMatrix shut down cleanly");
    Ok(())
}
