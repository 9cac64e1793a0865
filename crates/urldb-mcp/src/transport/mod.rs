// ABOUTME: Transport abstraction for MCP server communication channels
// ABOUTME: Defines the McpTransport and RequestHandler traits plus the mode allow-list and factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod http;
pub mod sse;
pub mod stdio;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use urldb::{ServerConfig, UrlDbError};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST};

/// Receives every decoded request from a transport
///
/// Returns `None` when the request is a notification and nothing must be sent.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one JSON-RPC request
    async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse>;
}

/// Transport layer for MCP JSON-RPC message exchange
///
/// Implementations handle the mechanics of reading requests and writing
/// responses over a specific channel (stdio, HTTP, SSE).
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Serve requests until `stop` is called, input ends, or an unrecoverable I/O error occurs
    ///
    /// Fails immediately when no request handler has been set.
    async fn start(&self) -> Result<(), UrlDbError>;

    /// Ask a running `start` to return; calling it again is harmless
    fn stop(&self);

    /// Install the handler that answers every request
    fn set_request_handler(&mut self, handler: Arc<dyn RequestHandler>);

    /// Change the listen port (ignored by the stream transport)
    fn set_port(&mut self, port: u16);

    /// Transport mode name
    fn name(&self) -> &'static str;
}

/// Supported transport modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Newline-tolerant JSON stream over stdin/stdout
    Stdio,
    /// One JSON-RPC exchange per `POST /mcp`
    Http,
    /// Like `Http`, with the response framed as a server-sent event
    Sse,
}

/// Accepted mode names in allow-list order
pub const SUPPORTED_MODES: [&str; 3] = ["stdio", "http", "sse"];

impl TransportMode {
    /// Wire name of the mode
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = UrlDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            "sse" => Ok(Self::Sse),
            _ => Err(UrlDbError::config(format!(
                "unsupported mode '{s}'. Supported modes: [{}]",
                SUPPORTED_MODES.join(" ")
            ))),
        }
    }
}

/// Build the transport for the configured mode
///
/// The mode string is validated against the allow-list here, so an
/// unknown mode never reaches `start`.
pub fn create_transport(config: &ServerConfig) -> Result<Box<dyn McpTransport>, UrlDbError> {
    let mode: TransportMode = config.mcp_mode.parse()?;
    let transport: Box<dyn McpTransport> = match mode {
        TransportMode::Stdio => Box::new(stdio::StdioTransport::new()),
        TransportMode::Http => Box::new(http::HttpTransport::new(config.host.clone(), config.port)),
        TransportMode::Sse => Box::new(sse::SseTransport::new(config.host.clone(), config.port)),
    };
    Ok(transport)
}

/// Error returned by `start` when no handler was installed
fn missing_handler(transport: &str) -> UrlDbError {
    UrlDbError::config(format!("{transport} transport started without a request handler"))
}

/// Interpret a decoded JSON value as a request envelope
///
/// Valid JSON that is not a request becomes an `INVALID_REQUEST` response
/// carrying the id when one can be read.
fn request_from_value(value: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let id = value.get("id").cloned().filter(|id| !id.is_null());
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Received JSON that is not a JSON-RPC request");
        JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid Request: {e}"))
    })
}
