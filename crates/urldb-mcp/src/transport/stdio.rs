// ABOUTME: Stream transport decoding consecutive JSON-RPC values from stdin and answering on stdout
// ABOUTME: Tolerates arbitrary framing, resynchronizes after malformed input, and stops on request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use urldb::UrlDbError;

use crate::protocol::{JsonRpcResponse, PARSE_ERROR};
use crate::transport::{
    missing_handler, request_from_value, McpTransport, RequestHandler, TransportMode,
};

/// Boxed input half of the stream
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed output half of the stream
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

const READ_CHUNK: usize = 8 * 1024;

/// MCP transport over a byte stream, stdin/stdout by default
///
/// Messages are decoded one JSON value at a time, so requests may span
/// lines or share a line. Responses are written as single lines. Logs go
/// to stderr to avoid polluting the protocol channel.
pub struct StdioTransport {
    io: Mutex<Option<(BoxedReader, BoxedWriter)>>,
    handler: Option<Arc<dyn RequestHandler>>,
    shutdown: watch::Sender<bool>,
}

impl StdioTransport {
    /// Transport over the process stdin and stdout
    pub fn new() -> Self {
        Self::with_io(Box::new(tokio::io::stdin()), Box::new(tokio::io::stdout()))
    }

    /// Transport over an arbitrary reader and writer
    pub fn with_io(reader: BoxedReader, writer: BoxedWriter) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            io: Mutex::new(Some((reader, writer))),
            handler: None,
            shutdown,
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn start(&self) -> Result<(), UrlDbError> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| missing_handler(self.name()))?;
        let Some((mut reader, mut writer)) = self.io.lock().await.take() else {
            return Err(UrlDbError::internal("stdio transport was already started"));
        };
        let mut shutdown = self.shutdown.subscribe();

        info!("Stdio transport ready, waiting for JSON-RPC messages on stdin");

        let mut decoder = FrameDecoder::default();
        let mut chunk = vec![0_u8; READ_CHUNK];
        loop {
            while let Some(frame) = decoder.next_frame() {
                if let Some(response) = dispatch(handler.as_ref(), frame).await {
                    write_response(&mut writer, &response).await;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => {
                        if decoder.has_pending() {
                            warn!("Discarding incomplete JSON-RPC message at end of input");
                        }
                        debug!("Stdin closed, shutting down stdio transport");
                        break;
                    }
                    Ok(n) => decoder.extend(&chunk[..n]),
                    Err(e) => return Err(UrlDbError::internal(format!("stdin read failed: {e}"))),
                },
            }
        }

        Ok(())
    }

    fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    fn set_request_handler(&mut self, handler: Arc<dyn RequestHandler>) {
        self.handler = Some(handler);
    }

    fn set_port(&mut self, _port: u16) {}

    fn name(&self) -> &'static str {
        TransportMode::Stdio.as_str()
    }
}

/// One unit cut out of the input stream
#[derive(Debug)]
enum Frame {
    /// A complete JSON value
    Message(Value),
    /// Bytes that are not JSON
    Malformed(String),
}

/// Incremental JSON value decoder over a growing byte buffer
#[derive(Default)]
struct FrameDecoder {
    buffer: Vec<u8>,
    /// Drop input up to and including the next newline before decoding again
    resync: bool,
}

impl FrameDecoder {
    fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn has_pending(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Cut the next complete frame, or `None` when more input is needed
    fn next_frame(&mut self) -> Option<Frame> {
        if self.resync {
            let newline = self.buffer.iter().position(|b| *b == b'\n');
            match newline {
                Some(pos) => {
                    self.buffer.drain(..=pos);
                    self.resync = false;
                }
                None => {
                    self.buffer.clear();
                    return None;
                }
            }
        }

        let (next, consumed) = {
            let mut values =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            let next = values.next();
            (next, values.byte_offset())
        };
        match next {
            None => {
                self.buffer.clear();
                None
            }
            Some(Ok(value)) => {
                self.buffer.drain(..consumed);
                Some(Frame::Message(value))
            }
            Some(Err(e)) if e.is_eof() => None,
            Some(Err(e)) => {
                let offset = error_offset(&self.buffer, e.line(), e.column());
                let line_start = self.buffer[..offset]
                    .iter()
                    .rposition(|b| *b == b'\n')
                    .map_or(0, |i| i + 1);
                let started_earlier = self.buffer[..line_start]
                    .iter()
                    .any(|b| !b.is_ascii_whitespace());
                let mid_line = self.buffer[line_start..offset]
                    .iter()
                    .any(|b| !b.is_ascii_whitespace());
                if started_earlier && !mid_line {
                    // An unterminated value ended on an earlier line; the
                    // line holding the error starts a fresh frame.
                    self.buffer.drain(..line_start);
                } else {
                    self.buffer.drain(..offset);
                    self.resync = true;
                }
                Some(Frame::Malformed(e.to_string()))
            }
        }
    }
}

/// Byte offset of a 1-based line/column position reported by `serde_json`
fn error_offset(buffer: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        buffer
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map_or(0, |(i, _)| i + 1)
    };
    (line_start + column.saturating_sub(1)).min(buffer.len())
}

/// Turn a frame into the response to send, if any
async fn dispatch(handler: &dyn RequestHandler, frame: Frame) -> Option<JsonRpcResponse> {
    let value = match frame {
        Frame::Message(value) => value,
        Frame::Malformed(reason) => {
            error!(error = %reason, "Failed to parse JSON-RPC message");
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {reason}"),
            ));
        }
    };

    match request_from_value(value) {
        Ok(request) => {
            debug!(method = %request.method, "Handling MCP request");
            handler.handle(request).await
        }
        Err(response) => Some(response),
    }
}

/// Serialize and write a JSON-RPC response as a single line
///
/// Failures are logged and the loop keeps serving.
async fn write_response(writer: &mut BoxedWriter, response: &JsonRpcResponse) {
    let mut line = match serde_json::to_vec(response) {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "JSON-RPC response serialization failed");
            return;
        }
    };
    line.push(b'\n');

    if let Err(e) = writer.write_all(&line).await {
        error!(error = %e, "stdout write failed");
        return;
    }
    if let Err(e) = writer.flush().await {
        error!(error = %e, "stdout flush failed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::{duplex, split, AsyncBufReadExt, BufReader};

    use super::*;
    use crate::protocol::{JsonRpcRequest, INVALID_REQUEST};

    struct Echo;

    #[async_trait]
    impl RequestHandler for Echo {
        async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
            request
                .id
                .map(|id| JsonRpcResponse::success(Some(id), json!({"method": request.method})))
        }
    }

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Frame> {
        std::iter::from_fn(|| decoder.next_frame()).collect()
    }

    async fn run(input: &[u8]) -> Vec<Value> {
        let (client, server) = duplex(1 << 16);
        let (server_read, server_write) = split(server);
        let mut transport = StdioTransport::with_io(Box::new(server_read), Box::new(server_write));
        transport.set_request_handler(Arc::new(Echo));

        let (client_read, mut client_write) = split(client);
        client_write.write_all(input).await.expect("write input");
        client_write.shutdown().await.expect("close input");

        transport.start().await.expect("clean exit");
        drop(transport);

        let mut lines = BufReader::new(client_read).lines();
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.expect("read output") {
            out.push(serde_json::from_str(&line).expect("json line"));
        }
        out
    }

    #[test]
    fn decoder_handles_split_and_joined_values() {
        let mut decoder = FrameDecoder::default();
        decoder.extend(br#"{"a":1}{"b""#);
        let frames = decode_all(&mut decoder);
        assert!(matches!(&frames[..], [Frame::Message(_)]));
        assert!(decoder.has_pending());

        decoder.extend(b":2}\n  ");
        let frames = decode_all(&mut decoder);
        assert!(matches!(&frames[..], [Frame::Message(v)] if v["b"] == 2));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn decoder_resyncs_after_garbage() {
        let mut decoder = FrameDecoder::default();
        decoder.extend(b"{\"ok\":1}\nnot json at all\n{\"next\":true}\n");
        let frames = decode_all(&mut decoder);
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[1], Frame::Malformed(_)));
        assert!(matches!(&frames[2], Frame::Message(v) if v["next"] == true));
    }

    #[test]
    fn unterminated_value_keeps_the_next_line() {
        let mut decoder = FrameDecoder::default();
        decoder.extend(b"{\"id\":1,\"method\":\"ping\"\n{\"id\":2,\"method\":\"ping\"}\n");
        let frames = decode_all(&mut decoder);
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Frame::Malformed(_)));
        assert!(matches!(&frames[1], Frame::Message(v) if v["id"] == 2));
    }

    #[test]
    fn bad_line_after_newline_is_one_error() {
        let mut decoder = FrameDecoder::default();
        decoder.extend(b"\nxyz\n{\"id\":3}\n");
        let frames = decode_all(&mut decoder);
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Frame::Malformed(_)));
        assert!(matches!(&frames[1], Frame::Message(v) if v["id"] == 3));
    }

    #[test]
    fn decoder_waits_for_rest_of_bad_line() {
        let mut decoder = FrameDecoder::default();
        decoder.extend(b"}}} partial");
        assert!(matches!(&decode_all(&mut decoder)[..], [Frame::Malformed(_)]));

        decoder.extend(b" still garbage\n{\"id\":1}");
        let frames = decode_all(&mut decoder);
        assert!(matches!(&frames[..], [Frame::Message(v)] if v["id"] == 1));
    }

    #[tokio::test]
    async fn requests_may_span_lines() {
        let out = run(b"{\"jsonrpc\":\"2.0\",\n\"id\":1,\n\"method\":\"ping\"}\n").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 1);
        assert_eq!(out[0]["result"]["method"], "ping");
    }

    #[tokio::test]
    async fn malformed_json_does_not_end_the_session() {
        let out = run(b"{oops\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n").await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(out[1]["id"], 2);
    }

    #[tokio::test]
    async fn missing_brace_does_not_swallow_next_request() {
        let out = run(
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        )
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(out[1]["id"], 2);
        assert_eq!(out[1]["result"]["method"], "ping");
    }

    #[tokio::test]
    async fn non_request_json_is_invalid_request() {
        let out = run(b"[1,2,3]\n{\"id\":5,\"jsonrpc\":\"2.0\"}\n").await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"]["code"], INVALID_REQUEST);
        assert!(out[0].get("id").is_none());
        assert_eq!(out[1]["error"]["code"], INVALID_REQUEST);
        assert_eq!(out[1]["id"], 5);
    }

    #[tokio::test]
    async fn notifications_produce_no_output() {
        let out = run(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn start_requires_a_handler() {
        let transport =
            StdioTransport::with_io(Box::new(tokio::io::empty()), Box::new(tokio::io::sink()));
        let err = transport.start().await.expect_err("no handler");
        assert!(err.message.contains("without a request handler"));
    }

    #[tokio::test]
    async fn stop_ends_a_blocked_read() {
        let (_client, server) = duplex(64);
        let (server_read, server_write) = split(server);
        let mut transport = StdioTransport::with_io(Box::new(server_read), Box::new(server_write));
        transport.set_request_handler(Arc::new(Echo));
        let transport = Arc::new(transport);

        let running = Arc::clone(&transport);
        let task = tokio::spawn(async move { running.start().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.stop();
        transport.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("stopped in time")
            .expect("join");
        assert!(result.is_ok());
    }
}
