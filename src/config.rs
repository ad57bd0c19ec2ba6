/*
 *  config.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered under command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::display::MachineConfig;
use crate::display::sink::flaschen::{DEFAULT_FT_PORT, FlaschenConfig};
use crate::poller::PollerConfig;
use crate::render::RenderConfig;
use crate::sources::LmsSourceConfig;

pub const DEFAULT_WIDTH: u32 = 64;
pub const DEFAULT_HEIGHT: u32 = 64;
/// Smallest canvas the compact layout still fits on
pub const MIN_CANVAS: u32 = 24;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level file layout. Every field is optional so files can be partial.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,
    pub matrix: Option<MatrixConfig>,
    pub playback: Option<PlaybackConfig>,
    pub lms: Option<LmsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MatrixConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Render period in milliseconds
    pub tick_ms: Option<u64>,
    /// Blank the panel after this many idle seconds
    pub shutdown_delay_secs: Option<u64>,
    pub sink: Option<SinkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Flaschen {
        host: Option<String>,
        port: Option<u16>,
        layer: Option<u8>,
        offset_x: Option<i32>,
        offset_y: Option<i32>,
    },
    /// Render without a panel
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlaybackConfig {
    pub full_screen_always: Option<bool>,
    pub pause_delay_secs: Option<u64>,
    pub scroll_delay_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub startup_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LmsConfig {
    /// Player name, `-` for the first player found
    pub player: Option<String>,
    /// Skip discovery when set
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "LyMatrix", about = "LyMatrix - now playing on an RGB LED matrix", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// More logging, -v debug, -vv trace
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
    /// Always show artwork fullscreen
    #[arg(short = 'f', long, action = ArgAction::SetTrue)]
    pub fullscreen: bool,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    /// LMS player name to follow
    #[arg(short = 'N', long = "name")]
    pub player_name: Option<String>,
    #[arg(long)]
    pub lms_host: Option<String>,
    #[arg(long)]
    pub lms_port: Option<u16>,
    /// Flaschen-Taschen server host
    #[arg(long)]
    pub sink_host: Option<String>,
    #[arg(long)]
    pub sink_port: Option<u16>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Read YAML (explicit path or search) and layer the CLI on top.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if !p.exists() {
            return Err(ConfigError::Validation(format!("Config file not found: {}", p.display())));
        }
        merge(&mut cfg, read_yaml(p)?);
    } else if let Some(p) = find_config_file() {
        merge(&mut cfg, read_yaml(&p)?);
    }

    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/lymatrix/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lymatrix.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["lymatrix.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    parse_yaml(&fs::read_to_string(path)?)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(s)?)
}

pub fn to_yaml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.matrix, src.matrix) {
        (None, Some(m)) => dst.matrix = Some(m),
        (Some(d), Some(s)) => merge_matrix(d, s),
        _ => {}
    }
    match (&mut dst.playback, src.playback) {
        (None, Some(p)) => dst.playback = Some(p),
        (Some(d), Some(s)) => merge_playback(d, s),
        _ => {}
    }
    match (&mut dst.lms, src.lms) {
        (None, Some(l)) => dst.lms = Some(l),
        (Some(d), Some(s)) => {
            if s.player.is_some() { d.player = s.player; }
            if s.host.is_some()   { d.host = s.host; }
            if s.port.is_some()   { d.port = s.port; }
        }
        _ => {}
    }
}

fn merge_matrix(dst: &mut MatrixConfig, src: MatrixConfig) {
    if src.width.is_some()               { dst.width = src.width; }
    if src.height.is_some()              { dst.height = src.height; }
    if src.tick_ms.is_some()             { dst.tick_ms = src.tick_ms; }
    if src.shutdown_delay_secs.is_some() { dst.shutdown_delay_secs = src.shutdown_delay_secs; }
    if src.sink.is_some()                { dst.sink = src.sink; }
}

fn merge_playback(dst: &mut PlaybackConfig, src: PlaybackConfig) {
    if src.full_screen_always.is_some() { dst.full_screen_always = src.full_screen_always; }
    if src.pause_delay_secs.is_some()   { dst.pause_delay_secs = src.pause_delay_secs; }
    if src.scroll_delay_secs.is_some()  { dst.scroll_delay_secs = src.scroll_delay_secs; }
    if src.poll_interval_ms.is_some()   { dst.poll_interval_ms = src.poll_interval_ms; }
    if src.startup_delay_secs.is_some() { dst.startup_delay_secs = src.startup_delay_secs; }
}

pub fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    match cli.verbose {
        0 => {}
        1 => cfg.log_level = Some("debug".into()),
        _ => cfg.log_level = Some("trace".into()),
    }

    if cli.width.is_some() || cli.height.is_some() || cli.sink_host.is_some() || cli.sink_port.is_some() {
        let matrix = cfg.matrix.get_or_insert_with(MatrixConfig::default);
        if cli.width.is_some()  { matrix.width = cli.width; }
        if cli.height.is_some() { matrix.height = cli.height; }

        if cli.sink_host.is_some() || cli.sink_port.is_some() {
            let mut sink = match matrix.sink.take() {
                Some(ft @ SinkConfig::Flaschen { .. }) => ft,
                _ => SinkConfig::Flaschen { host: None, port: None, layer: None, offset_x: None, offset_y: None },
            };
            if let SinkConfig::Flaschen { host, port, .. } = &mut sink {
                if cli.sink_host.is_some() { *host = cli.sink_host.clone(); }
                if cli.sink_port.is_some() { *port = cli.sink_port; }
            }
            matrix.sink = Some(sink);
        }
    }

    if cli.fullscreen {
        cfg.playback.get_or_insert_with(PlaybackConfig::default).full_screen_always = Some(true);
    }

    if cli.player_name.is_some() || cli.lms_host.is_some() || cli.lms_port.is_some() {
        let lms = cfg.lms.get_or_insert_with(LmsConfig::default);
        if cli.player_name.is_some() { lms.player = cli.player_name.clone(); }
        if cli.lms_host.is_some()    { lms.host = cli.lms_host.clone(); }
        if cli.lms_port.is_some()    { lms.port = cli.lms_port; }
    }
}

/// Reject values the render pipeline cannot work with.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(matrix) = cfg.matrix.as_ref() {
        for (name, value) in [("width", matrix.width), ("height", matrix.height)] {
            match value {
                Some(0) => return Err(ConfigError::Validation(format!("matrix {} must be > 0", name))),
                Some(v) if v < MIN_CANVAS => {
                    return Err(ConfigError::Validation(format!(
                        "matrix {} must be at least {} pixels, got {}",
                        name, MIN_CANVAS, v
                    )));
                }
                _ => {}
            }
        }
        if matrix.tick_ms == Some(0) {
            return Err(ConfigError::Validation("matrix tick_ms must be > 0".into()));
        }
        if let Some(SinkConfig::Flaschen { port: Some(0), .. }) = matrix.sink {
            return Err(ConfigError::Validation("sink port must be > 0".into()));
        }
    }
    if let Some(playback) = cfg.playback.as_ref() {
        if playback.poll_interval_ms == Some(0) {
            return Err(ConfigError::Validation("playback poll_interval_ms must be > 0".into()));
        }
    }
    Ok(())
}

/// Where frames go once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSettings {
    Flaschen(FlaschenConfig),
    Null,
}

/// Fully resolved settings with every default filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub width: u32,
    pub height: u32,
    pub render: RenderConfig,
    pub machine: MachineConfig,
    pub poller: PollerConfig,
    pub sink: SinkSettings,
    pub lms: LmsSourceConfig,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        validate(cfg)?;

        let matrix = cfg.matrix.clone().unwrap_or_default();
        let playback = cfg.playback.clone().unwrap_or_default();
        let lms = cfg.lms.clone().unwrap_or_default();

        let render_defaults = RenderConfig::default();
        let machine_defaults = MachineConfig::default();
        let poller_defaults = PollerConfig::default();

        let sink = match matrix.sink {
            Some(SinkConfig::Disabled) => SinkSettings::Null,
            Some(SinkConfig::Flaschen { host, port, layer, offset_x, offset_y }) => {
                let d = FlaschenConfig::default();
                SinkSettings::Flaschen(FlaschenConfig {
                    host: host.unwrap_or(d.host),
                    port: port.unwrap_or(DEFAULT_FT_PORT),
                    layer: layer.unwrap_or(d.layer),
                    offset_x: offset_x.unwrap_or(d.offset_x),
                    offset_y: offset_y.unwrap_or(d.offset_y),
                })
            }
            None => SinkSettings::Flaschen(FlaschenConfig::default()),
        };

        Ok(Self {
            log_level: cfg.log_level.clone().unwrap_or_else(|| "info".to_string()),
            width: matrix.width.unwrap_or(DEFAULT_WIDTH),
            height: matrix.height.unwrap_or(DEFAULT_HEIGHT),
            render: RenderConfig {
                tick: matrix.tick_ms.map(Duration::from_millis).unwrap_or(render_defaults.tick),
                shutdown_delay: matrix
                    .shutdown_delay_secs
                    .map(Duration::from_secs)
                    .unwrap_or(render_defaults.shutdown_delay),
            },
            machine: MachineConfig {
                full_screen_always: playback.full_screen_always.unwrap_or(machine_defaults.full_screen_always),
                pause_delay: playback
                    .pause_delay_secs
                    .map(Duration::from_secs)
                    .unwrap_or(machine_defaults.pause_delay),
                scroll_delay: playback
                    .scroll_delay_secs
                    .map(Duration::from_secs)
                    .unwrap_or(machine_defaults.scroll_delay),
            },
            poller: PollerConfig {
                interval: playback
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(poller_defaults.interval),
                startup_delay: playback
                    .startup_delay_secs
                    .map(Duration::from_secs)
                    .unwrap_or(poller_defaults.startup_delay),
            },
            sink,
            lms: LmsSourceConfig {
                player: lms.player.unwrap_or_else(|| "-".to_string()),
                host: lms.host,
                port: lms.port,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::from_config(&Config::default()).unwrap();
        assert_eq!((s.width, s.height), (64, 64));
        assert_eq!(s.render.tick, Duration::from_millis(80));
        assert_eq!(s.render.shutdown_delay, Duration::from_secs(600));
        assert_eq!(s.machine.pause_delay, Duration::from_secs(5));
        assert_eq!(s.machine.scroll_delay, Duration::from_secs(4));
        assert!(!s.machine.full_screen_always);
        assert_eq!(s.poller.interval, Duration::from_secs(1));
        assert_eq!(s.poller.startup_delay, Duration::from_secs(3));
        assert_eq!(s.lms.player, "-");
        assert_eq!(s.sink, SinkSettings::Flaschen(FlaschenConfig::default()));
    }

    #[test]
    fn test_yaml_then_cli_precedence() {
        let yaml = r#"
log_level: warn
matrix:
  width: 128
  height: 64
  sink:
    type: flaschen
    host: matrix.local
    layer: 3
playback:
  pause_delay_secs: 8
lms:
  player: Kitchen
"#;
        let mut cfg = Config::default();
        merge(&mut cfg, parse_yaml(yaml).unwrap());

        let cli = Cli {
            height: Some(32),
            player_name: Some("Den".into()),
            sink_port: Some(1400),
            fullscreen: true,
            verbose: 1,
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        let s = Settings::from_config(&cfg).unwrap();

        assert_eq!(s.log_level, "debug");
        assert_eq!((s.width, s.height), (128, 32));
        assert_eq!(s.machine.pause_delay, Duration::from_secs(8));
        assert!(s.machine.full_screen_always);
        assert_eq!(s.lms.player, "Den");
        match s.sink {
            SinkSettings::Flaschen(ft) => {
                assert_eq!(ft.host, "matrix.local");
                assert_eq!(ft.port, 1400);
                assert_eq!(ft.layer, 3);
            }
            other => panic!("unexpected sink {:?}", other),
        }
    }

    #[test]
    fn test_disabled_sink_from_yaml() {
        let cfg = parse_yaml("matrix:\n  sink:\n    type: disabled\n").unwrap();
        assert_eq!(Settings::from_config(&cfg).unwrap().sink, SinkSettings::Null);
    }

    #[test]
    fn test_validation() {
        let mut cfg = Config::default();
        cfg.matrix = Some(MatrixConfig { width: Some(0), ..Default::default() });
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        cfg.matrix = Some(MatrixConfig { height: Some(16), ..Default::default() });
        assert!(validate(&cfg).is_err());

        cfg.matrix = Some(MatrixConfig { tick_ms: Some(0), ..Default::default() });
        assert!(validate(&cfg).is_err());

        cfg.matrix = Some(MatrixConfig { width: Some(32), height: Some(32), ..Default::default() });
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut dst = parse_yaml("playback:\n  scroll_delay_secs: 2\n  pause_delay_secs: 9\n").unwrap();
        merge(&mut dst, parse_yaml("playback:\n  pause_delay_secs: 3\n").unwrap());
        let p = dst.playback.unwrap();
        assert_eq!(p.scroll_delay_secs, Some(2));
        assert_eq!(p.pause_delay_secs, Some(3));
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse_yaml("lms:\n  host: 10.0.0.5\n  port: 9000\n").unwrap();
        let back = parse_yaml(&to_yaml(&cfg).unwrap()).unwrap();
        assert_eq!(cfg, back);
    }
}
