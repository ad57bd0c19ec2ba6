/*
 *  sources/rpc.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  LMS slim.request JSON-RPC client
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

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("LyMatrix v", env!("CARGO_PKG_VERSION"));
const SLIM_REQUEST: &str = "slim.request";

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("JSON deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("LMS server error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),
    #[error("LMS server response missing 'result' field")]
    MissingResult,
    #[error("LMS server response missing 'id' field")]
    MissingId,
    #[error("LMS server ID mismatch: expected {expected}, received {received:?}")]
    IdMismatch { expected: u32, received: Option<u32> },
}

/// Wire payload, `params` is `[player_id, [command, args...]]`.
#[derive(Debug, Serialize)]
pub struct SlimRequest {
    pub id: u32,
    pub method: &'static str,
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Option<u32>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Validate id and error fields, yielding the `result` payload.
    pub fn into_result(self, expected: u32) -> Result<Value, RpcClientError> {
        match self.id {
            None => return Err(RpcClientError::MissingId),
            Some(id) if id != expected => {
                return Err(RpcClientError::IdMismatch { expected, received: self.id });
            }
            _ => {}
        }
        if let Some(error) = self.error {
            return Err(RpcClientError::Rpc(error));
        }
        self.result.ok_or(RpcClientError::MissingResult)
    }
}

/// Build the request body for one command.
pub fn build_request(id: u32, player_id: &str, command: &str, args: Vec<Value>) -> SlimRequest {
    let mut command_and_args = vec![json!(command)];
    command_and_args.extend(args);
    SlimRequest {
        id,
        method: SLIM_REQUEST,
        params: vec![Value::String(player_id.to_string()), Value::Array(command_and_args)],
    }
}

#[derive(Debug)]
pub struct LmsRpcClient {
    next_id: u32,
    client: Client,
}

impl LmsRpcClient {
    pub fn new() -> Result<Self, RpcClientError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(header::CONNECTION, header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .http1_only()
            .connect_timeout(Duration::from_millis(500))
            .default_headers(headers)
            .timeout(Duration::from_millis(800))
            .build()?;

        Ok(Self { next_id: 1, client })
    }

    /// POST one `slim.request` to `http://host:port/jsonrpc.js`.
    ///
    /// `player_id` is the player MAC, or empty for server-wide commands.
    pub async fn send_slim_request(
        &mut self,
        host: &str,
        port: u16,
        player_id: &str,
        command: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcClientError> {
        let request_id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        let url = format!("http://{}:{}/jsonrpc.js", host, port);
        let body = serde_json::to_string(&build_request(request_id, player_id, command, args))
            .map_err(RpcClientError::Serialization)?;

        let response = self.client.post(&url).body(body).send().await?;
        response.error_for_status_ref()?;
        let text = response.text().await?;

        let rpc: JsonRpcResponse = serde_json::from_str(&text).map_err(RpcClientError::Deserialization)?;
        rpc.into_result(request_id)
    }
}
