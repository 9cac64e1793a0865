// ABOUTME: SSE transport answering each POST /mcp with a single server-sent event
// ABOUTME: Reuses the HTTP endpoint and frames the JSON-RPC response as one data event
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
    CONNECTION, CONTENT_TYPE,
};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::stream;
use tracing::error;
use urldb::UrlDbError;

use crate::protocol::JsonRpcResponse;
use crate::transport::http::{with_headers, Endpoint};
use crate::transport::{McpTransport, RequestHandler, TransportMode};

/// Headers sent with every SSE response and preflight
pub(crate) static SSE_HEADERS: [(HeaderName, &str); 5] = [
    (CONTENT_TYPE, "text/event-stream"),
    (CACHE_CONTROL, "no-cache"),
    (CONNECTION, "keep-alive"),
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_HEADERS, "Cache-Control"),
];

/// MCP transport over HTTP with Server-Sent Events framing
///
/// Each exchange is independent: one POST, one `data:` event, end of
/// stream. There is no session registry.
pub struct SseTransport {
    endpoint: Endpoint,
}

impl SseTransport {
    /// Create an SSE transport bound to the given host and port
    pub fn new(host: String, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(TransportMode::Sse, host, port),
        }
    }

    /// The axum router, for serving elsewhere or driving in tests
    pub fn router(&self) -> Result<Router, UrlDbError> {
        self.endpoint.router()
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn start(&self) -> Result<(), UrlDbError> {
        self.endpoint.serve().await
    }

    fn stop(&self) {
        self.endpoint.stop();
    }

    fn set_request_handler(&mut self, handler: Arc<dyn RequestHandler>) {
        self.endpoint.set_request_handler(handler);
    }

    fn set_port(&mut self, port: u16) {
        self.endpoint.set_port(port);
    }

    fn name(&self) -> &'static str {
        TransportMode::Sse.as_str()
    }
}

/// Wrap a JSON-RPC response in a single SSE event
pub(crate) fn respond_sse(response: &JsonRpcResponse) -> Response {
    let event = Event::default().json_data(response).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize SSE response");
        Event::default()
            .data(r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Serialization failed"}}"#)
    });
    let event_stream = stream::once(async { Ok::<_, Infallible>(event) });

    with_headers(Sse::new(event_stream).into_response(), TransportMode::Sse)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::protocol::JsonRpcRequest;

    struct Fixed;

    #[async_trait]
    impl RequestHandler for Fixed {
        async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
            request.id.map(|id| JsonRpcResponse::success(Some(id), json!({"ok": true})))
        }
    }

    fn app() -> Router {
        let mut transport = SseTransport::new("127.0.0.1".to_owned(), 0);
        transport.set_request_handler(Arc::new(Fixed));
        transport.router().expect("router")
    }

    #[tokio::test]
    async fn response_is_one_data_event() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .expect("build request"),
            )
            .await
            .expect("send request");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
        assert_eq!(headers[CONNECTION], "keep-alive");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        let body = String::from_utf8(bytes.to_vec()).expect("utf8");
        let payload = body
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("single data event");
        let json: serde_json::Value = serde_json::from_str(payload).expect("json payload");
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["ok"], true);
    }

    #[tokio::test]
    async fn health_reports_sse_mode() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("send request");
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["mode"], "sse");
    }
}
