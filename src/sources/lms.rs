/*
 *  sources/lms.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Lyrion/Logitech Media Server playback source
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

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::playback::{PlaybackSnapshot, PlaybackSource, PlaybackUpdate, SourceError};
use crate::sources::deutils::{
    default_false, default_true, deserialize_bool_from_anything, deserialize_numeric_i16,
    deserialize_opt_seconds, deserialize_opt_string,
};
use crate::sources::discovery;
use crate::sources::rpc::LmsRpcClient;

pub const DEFAULT_LMS_PORT: u16 = 9000;
const STATUS_TAGS: &str = "tags:aAcdKlNx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsSourceConfig {
    /// Player name to follow, `-` picks the first one the server lists
    pub player: String,
    /// Skip discovery when set
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Default for LmsSourceConfig {
    fn default() -> Self {
        Self { player: "-".to_string(), host: None, port: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    #[serde(rename = "playerindex", default, deserialize_with = "deserialize_numeric_i16")]
    pub player_index: i16,
    pub name: String,
    #[serde(rename = "playerid")]
    pub player_id: String,
    #[serde(default = "default_false", deserialize_with = "deserialize_bool_from_anything")]
    pub connected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "remotetitle")]
    pub remote_title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub trackartist: Option<String>,
    #[serde(default)]
    pub albumartist: Option<String>,
    #[serde(default)]
    pub performer: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub coverid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub duration: Option<f64>,
}

impl Track {
    fn title(&self) -> String {
        non_empty(&self.title)
            .or_else(|| non_empty(&self.remote_title))
            .unwrap_or_default()
    }

    fn artist(&self) -> String {
        [&self.artist, &self.trackartist, &self.albumartist, &self.performer]
            .into_iter()
            .find_map(non_empty)
            .unwrap_or_default()
    }

    fn artwork_url(&self, base_url: &str) -> String {
        if let Some(url) = non_empty(&self.artwork_url) {
            if url.starts_with("http://") || url.starts_with("https://") {
                return url;
            }
            return format!("{}/{}", base_url, url.trim_start_matches('/'));
        }
        match non_empty(&self.coverid) {
            Some(id) => format!("{}/music/{}/cover.jpg", base_url, id),
            None => String::new(),
        }
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_from_anything")]
    pub power: bool,
    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_seconds")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub playlist_loop: Vec<Track>,
}

fn seconds_to_ms(secs: Option<f64>) -> u64 {
    secs.filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| (s * 1000.0).round() as u64)
        .unwrap_or(0)
}

/// Map one `status` reply onto a playback update.
///
/// `base_url` is `http://host:port` and anchors relative artwork paths.
pub fn update_from_status(status: &PlayerStatus, base_url: &str) -> PlaybackUpdate {
    if !status.power {
        return PlaybackUpdate::Inactive;
    }
    let is_playing = match status.mode.as_deref() {
        Some("play") => true,
        Some("pause") => false,
        _ => return PlaybackUpdate::Inactive,
    };
    let Some(track) = status.playlist_loop.first() else {
        return PlaybackUpdate::Inactive;
    };

    PlaybackUpdate::from_snapshot(Some(PlaybackSnapshot {
        artist: track.artist(),
        title: track.title(),
        artwork_url: track.artwork_url(base_url),
        is_playing,
        progress_ms: seconds_to_ms(status.time),
        duration_ms: seconds_to_ms(track.duration.or(status.duration)),
    }))
}

/// Case-insensitive match on player name, `-` takes the first.
pub fn select_player<'a>(players: &'a [Player], filter: &str) -> Option<&'a Player> {
    if filter == "-" {
        return players.first();
    }
    players.iter().find(|p| p.name.eq_ignore_ascii_case(filter))
}

#[derive(Debug, Clone)]
struct ServerAddr {
    host: String,
    port: u16,
}

impl ServerAddr {
    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct LmsSource {
    config: LmsSourceConfig,
    client: LmsRpcClient,
    server: Option<ServerAddr>,
    player_id: Option<String>,
}

impl LmsSource {
    pub fn new(config: LmsSourceConfig) -> Result<Self, SourceError> {
        let server = config.host.clone().map(|host| ServerAddr {
            host,
            port: config.port.unwrap_or(DEFAULT_LMS_PORT),
        });
        Ok(Self { config, client: LmsRpcClient::new()?, server, player_id: None })
    }

    async fn ensure_server(&mut self) -> Result<ServerAddr, SourceError> {
        if let Some(server) = &self.server {
            return Ok(server.clone());
        }
        let found = tokio::task::spawn_blocking(discovery::discover)
            .await
            .map_err(|e| SourceError::Discovery(e.to_string()))??;
        let server = ServerAddr {
            host: found.host.to_string(),
            port: self.config.port.unwrap_or(found.port),
        };
        self.server = Some(server.clone());
        Ok(server)
    }

    async fn ensure_player(&mut self, server: &ServerAddr) -> Result<String, SourceError> {
        if let Some(id) = &self.player_id {
            return Ok(id.clone());
        }
        debug!("Requesting players from {}:{}...", server.host, server.port);
        let result = self
            .client
            .send_slim_request(&server.host, server.port, "", "players", vec![json!("0"), json!("99")])
            .await?;
        let players: Vec<Player> = match result.get("players_loop") {
            Some(list) => serde_json::from_value(list.clone())?,
            None => Vec::new(),
        };
        debug!("Total players found: {}", players.len());

        let player = select_player(&players, &self.config.player)
            .ok_or_else(|| SourceError::NotReady(format!("player '{}' not found", self.config.player)))?;
        info!("Following player {} ({})", player.name, player.player_id);
        self.player_id = Some(player.player_id.clone());
        Ok(player.player_id.clone())
    }

    async fn fetch_status(&mut self) -> Result<PlaybackUpdate, SourceError> {
        let server = self.ensure_server().await?;
        let player_id = self.ensure_player(&server).await?;
        let result = self
            .client
            .send_slim_request(
                &server.host,
                server.port,
                &player_id,
                "status",
                vec![json!("-"), json!("1"), json!(STATUS_TAGS)],
            )
            .await?;
        let status: PlayerStatus = serde_json::from_value(result)?;
        Ok(update_from_status(&status, &server.base_url()))
    }
}

impl PlaybackSource for LmsSource {
    async fn poll(&mut self) -> Result<PlaybackUpdate, SourceError> {
        let result = self.fetch_status().await;
        if let Err(e) = &result {
            // players come and go, look the player up again next time
            if !matches!(e, SourceError::Discovery(_)) {
                warn!("LMS status failed, will re-resolve player: {}", e);
                self.player_id = None;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://10.0.0.5:9000";

    fn status(json: serde_json::Value) -> PlayerStatus {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_playing_status_maps_to_active() {
        let s = status(json!({
            "mode": "play",
            "power": 1,
            "time": 61.25,
            "duration": "200",
            "playlist_loop": [{
                "title": "Roygbiv",
                "artist": "Boards of Canada",
                "coverid": 12345,
                "duration": 150.5
            }]
        }));
        match update_from_status(&s, BASE) {
            PlaybackUpdate::Active(snap) => {
                assert_eq!(snap.title, "Roygbiv");
                assert_eq!(snap.artist, "Boards of Canada");
                assert!(snap.is_playing);
                assert_eq!(snap.progress_ms, 61_250);
                assert_eq!(snap.duration_ms, 150_500);
                assert_eq!(snap.artwork_url, "http://10.0.0.5:9000/music/12345/cover.jpg");
            }
            other => panic!("expected active, got {:?}", other),
        }
    }

    #[test]
    fn test_paused_radio_uses_fallbacks() {
        let s = status(json!({
            "mode": "pause",
            "time": "12",
            "playlist_loop": [{
                "title": "",
                "remote_title": "Late Night Radio",
                "albumartist": "Various",
                "artwork_url": "/imageproxy/abc/image.jpg"
            }]
        }));
        match update_from_status(&s, BASE) {
            PlaybackUpdate::Active(snap) => {
                assert_eq!(snap.title, "Late Night Radio");
                assert_eq!(snap.artist, "Various");
                assert!(!snap.is_playing);
                assert_eq!(snap.duration_ms, 0);
                assert_eq!(snap.progress_fraction(), 0.0);
                assert_eq!(snap.artwork_url, "http://10.0.0.5:9000/imageproxy/abc/image.jpg");
            }
            other => panic!("expected active, got {:?}", other),
        }
    }

    #[test]
    fn test_absolute_artwork_kept() {
        let s = status(json!({
            "mode": "play",
            "playlist_loop": [{"title": "T", "artwork_url": "https://cdn.example/a.jpg", "coverid": "9"}]
        }));
        match update_from_status(&s, BASE) {
            PlaybackUpdate::Active(snap) => assert_eq!(snap.artwork_url, "https://cdn.example/a.jpg"),
            other => panic!("expected active, got {:?}", other),
        }
    }

    #[test]
    fn test_inactive_cases() {
        let stopped = status(json!({"mode": "stop", "playlist_loop": [{"title": "T"}]}));
        assert_eq!(update_from_status(&stopped, BASE), PlaybackUpdate::Inactive);

        let off = status(json!({"mode": "play", "power": "0", "playlist_loop": [{"title": "T"}]}));
        assert_eq!(update_from_status(&off, BASE), PlaybackUpdate::Inactive);

        let empty = status(json!({"mode": "play"}));
        assert_eq!(update_from_status(&empty, BASE), PlaybackUpdate::Inactive);

        let untitled = status(json!({"mode": "play", "playlist_loop": [{"artist": "A"}]}));
        assert_eq!(update_from_status(&untitled, BASE), PlaybackUpdate::Inactive);
    }

    #[test]
    fn test_select_player() {
        let players: Vec<Player> = serde_json::from_value(json!([
            {"playerindex": "0", "name": "Kitchen", "playerid": "00:01", "connected": 1},
            {"playerindex": 1, "name": "Den", "playerid": "00:02", "connected": 0}
        ]))
        .unwrap();
        assert_eq!(select_player(&players, "-").map(|p| p.player_id.as_str()), Some("00:01"));
        assert_eq!(select_player(&players, "den").map(|p| p.player_id.as_str()), Some("00:02"));
        assert!(select_player(&players, "Garage").is_none());
        assert!(select_player(&[], "-").is_none());
    }
}
