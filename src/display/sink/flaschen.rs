/*
 *  display/sink/flaschen.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Flaschen-Taschen UDP sink, one PPM datagram per frame
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

use log::info;
use std::net::UdpSocket;

use crate::display::error::SinkError;
use crate::display::frame::Frame;
use crate::display::sink::DisplaySink;

pub const DEFAULT_FT_PORT: u16 = 1337;
const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaschenConfig {
    pub host: String,
    pub port: u16,
    /// Z layer, higher layers draw over lower ones on the server
    pub layer: u8,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for FlaschenConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_FT_PORT,
            layer: 1,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

/// Binary PPM with the `#FT:` offset comment the server understands.
pub fn encode_frame(frame: &Frame, config: &FlaschenConfig) -> Vec<u8> {
    let comment = format!("#FT: {} {} {}", config.offset_x, config.offset_y, config.layer);
    frame.to_ppm(Some(&comment))
}

pub struct FlaschenSink {
    socket: UdpSocket,
    config: FlaschenConfig,
    label: String,
    width: u32,
    height: u32,
}

impl FlaschenSink {
    /// Bind a local socket and connect it to the server.
    pub fn connect(config: FlaschenConfig, width: u32, height: u32) -> Result<Self, SinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect((config.host.as_str(), config.port))?;
        // sends must never stall the render tick
        socket.set_nonblocking(true)?;
        let label = format!("flaschen-taschen {}:{}", config.host, config.port);
        info!("Sending {}x{} frames to {}", width, height, label);
        Ok(Self { socket, config, label, width, height })
    }
}

impl DisplaySink for FlaschenSink {
    fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(SinkError::SizeMismatch {
                expected_w: self.width,
                expected_h: self.height,
                actual_w: frame.width(),
                actual_h: frame.height(),
            });
        }
        let datagram = encode_frame(frame, &self.config);
        if datagram.len() > MAX_DATAGRAM {
            return Err(SinkError::FrameTooLarge(datagram.len()));
        }
        match self.socket.send(&datagram) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header() {
        let config = FlaschenConfig { offset_x: 3, offset_y: 4, layer: 7, ..Default::default() };
        let bytes = encode_frame(&Frame::black(2, 2), &config);
        let header = b"P6\n2 2\n#FT: 3 4 7\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 12);
    }

    #[test]
    fn test_push_over_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();
        let port = server.local_addr().unwrap().port();

        let config = FlaschenConfig { host: "127.0.0.1".into(), port, ..Default::default() };
        let mut sink = FlaschenSink::connect(config, 4, 4).unwrap();
        sink.push(&Frame::black(4, 4)).unwrap();

        let mut buf = [0u8; 256];
        let n = server.recv(&mut buf).unwrap();
        assert!(buf[..n].starts_with(b"P6\n4 4\n#FT: 0 0 1\n255\n"));
    }

    #[test]
    fn test_rejects_wrong_size() {
        let config = FlaschenConfig { host: "127.0.0.1".into(), ..Default::default() };
        let mut sink = FlaschenSink::connect(config, 4, 4).unwrap();
        assert!(matches!(sink.push(&Frame::black(8, 8)), Err(SinkError::SizeMismatch { .. })));
    }
}
