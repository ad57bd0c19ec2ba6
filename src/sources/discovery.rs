/*
 *  sources/discovery.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  LMS UDP broadcast discovery
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

use log::{debug, error, info};
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use crate::playback::SourceError;

const LISTEN_ADDR: &str = "0.0.0.0:0";
pub const BROADCAST_PORT: u16 = 3483;
const DISCOVERY_PAYLOAD: &[u8] = b"eJSON\0IPAD\0NAME\0VERS\0UUID\0";
const TIMEOUT: Duration = Duration::from_millis(5000);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A server that answered the broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsServerInfo {
    pub host: IpAddr,
    pub port: u16,
    pub name: String,
    pub version: String,
    pub uuid: String,
}

/// Parse a discovery reply.
///
/// The reply is `E` followed by records of a 4-byte key, a length byte and
/// that many value bytes. `JSON` carries the HTTP port as ASCII digits.
/// Returns `(port, name, version, uuid)`.
pub fn parse_discovery_reply(buf: &[u8]) -> Option<(u16, String, String, String)> {
    if buf.first() != Some(&b'E') {
        return None;
    }
    let mut port = None;
    let mut name = String::new();
    let mut version = String::new();
    let mut uuid = String::new();

    let mut pos = 1;
    while pos + 5 <= buf.len() {
        let key = &buf[pos..pos + 4];
        let len = buf[pos + 4] as usize;
        let start = pos + 5;
        let end = start + len;
        if end > buf.len() {
            break;
        }
        let value = String::from_utf8_lossy(&buf[start..end]).into_owned();
        match key {
            b"JSON" => {
                port = value
                    .trim_matches(|c: char| !c.is_ascii_digit())
                    .parse::<u16>()
                    .ok();
            }
            b"NAME" => name = value,
            b"VERS" => version = value,
            b"UUID" => uuid = value,
            _ => {}
        }
        pos = end;
    }

    port.map(|p| (p, name, version, uuid))
}

/// Broadcast for an LMS server and wait for the first usable reply.
///
/// Blocking, call from `spawn_blocking`.
pub fn discover() -> Result<LmsServerInfo, SourceError> {
    let socket = UdpSocket::bind(LISTEN_ADDR)?;
    let broadcast_addr = SocketAddrV4::new(Ipv4Addr::BROADCAST, BROADCAST_PORT);
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;

    let start = Instant::now();
    let mut buffer = [0u8; 512];

    debug!("Attempting to discover LMS servers...");

    loop {
        if start.elapsed() >= TIMEOUT {
            error!("Timeout: No reply received within {:?}.", TIMEOUT);
            return Err(SourceError::Discovery("LMS server discovery timed-out".into()));
        }
        if let Err(e) = socket.send_to(DISCOVERY_PAYLOAD, broadcast_addr) {
            error!("Failed to send broadcast: {}", e);
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }
        match socket.recv_from(&mut buffer) {
            Ok((num_bytes, src_addr)) => {
                debug!("Received {} bytes from {}", num_bytes, src_addr);
                let Some((port, name, version, uuid)) = parse_discovery_reply(&buffer[..num_bytes]) else {
                    debug!("Ignoring malformed discovery reply from {}", src_addr);
                    continue;
                };
                let server = LmsServerInfo { host: src_addr.ip(), port, name, version, uuid };
                info!("LMS server ........: {}:{}", server.host, server.port);
                info!("LMS name ..........: {}", server.name);
                info!("LMS version .......: {}", server.version);
                info!("LMS UUID ..........: {}", server.uuid);
                return Ok(server);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                error!("Error receiving data: {}", e);
                return Err(e.into());
            }
        }
    }
}
