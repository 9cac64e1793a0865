// ABOUTME: HTTP transport serving one JSON-RPC exchange per POST /mcp with a health endpoint
// ABOUTME: Shares the axum router and graceful-shutdown loop with the SSE transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info};
use urldb::UrlDbError;

use crate::protocol::{JsonRpcResponse, PARSE_ERROR, SERVER_NAME};
use crate::transport::{
    missing_handler, request_from_value, sse, McpTransport, RequestHandler, TransportMode,
};

/// State shared by every route
#[derive(Clone)]
struct AppState {
    handler: Arc<dyn RequestHandler>,
    mode: TransportMode,
}

/// Listener settings and lifecycle shared by the HTTP and SSE transports
pub(crate) struct Endpoint {
    mode: TransportMode,
    host: String,
    port: u16,
    handler: Option<Arc<dyn RequestHandler>>,
    shutdown: watch::Sender<bool>,
}

impl Endpoint {
    pub(crate) fn new(mode: TransportMode, host: String, port: u16) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            mode,
            host,
            port,
            handler: None,
            shutdown,
        }
    }

    /// Build the router for this endpoint
    ///
    /// Routes:
    /// - `POST /mcp`: one JSON-RPC request in, one response out
    /// - `OPTIONS /mcp`: CORS preflight
    /// - `GET /health`: liveness
    pub(crate) fn router(&self) -> Result<Router, UrlDbError> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| missing_handler(self.mode.as_str()))?;
        let state = AppState {
            handler,
            mode: self.mode,
        };

        Ok(Router::new()
            .route("/mcp", post(handle_mcp_post).options(handle_preflight))
            .route("/health", get(handle_health))
            .with_state(state))
    }

    pub(crate) async fn serve(&self) -> Result<(), UrlDbError> {
        let app = self.router()?;
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| UrlDbError::internal(format!("Failed to bind {addr}: {e}")))?;

        info!(address = %addr, mode = %self.mode, "MCP transport listening");
        info!("Health check: http://{addr}/health");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                while !*shutdown.borrow_and_update() {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
            .map_err(|e| UrlDbError::internal(format!("HTTP server error: {e}")))?;

        info!(mode = %self.mode, "MCP transport stopped");
        Ok(())
    }

    pub(crate) fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub(crate) fn set_request_handler(&mut self, handler: Arc<dyn RequestHandler>) {
        self.handler = Some(handler);
    }

    pub(crate) fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

/// MCP transport over plain HTTP using axum
pub struct HttpTransport {
    endpoint: Endpoint,
}

impl HttpTransport {
    /// Create an HTTP transport bound to the given host and port
    pub fn new(host: String, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(TransportMode::Http, host, port),
        }
    }

    /// The axum router, for serving elsewhere or driving in tests
    pub fn router(&self) -> Result<Router, UrlDbError> {
        self.endpoint.router()
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
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
        TransportMode::Http.as_str()
    }
}

/// Handle `POST /mcp`
///
/// Notifications get `204 No Content`; everything else gets exactly one
/// JSON-RPC response, framed for the transport mode.
async fn handle_mcp_post(State(state): State<AppState>, body: String) -> Response {
    let response = match serde_json::from_str(&body) {
        Ok(value) => match request_from_value(value) {
            Ok(request) => {
                debug!(method = %request.method, mode = %state.mode, "Handling MCP request");
                match state.handler.handle(request).await {
                    Some(response) => response,
                    None => {
                        return with_headers(StatusCode::NO_CONTENT.into_response(), state.mode);
                    }
                }
            }
            Err(response) => response,
        },
        Err(e) => {
            error!(error = %e, "Failed to parse JSON-RPC body");
            JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"))
        }
    };

    match state.mode {
        TransportMode::Sse => sse::respond_sse(&response),
        TransportMode::Http | TransportMode::Stdio => {
            with_headers(Json(response).into_response(), state.mode)
        }
    }
}

/// Handle `OPTIONS /mcp` with an empty 200 carrying the CORS headers
async fn handle_preflight(State(state): State<AppState>) -> Response {
    with_headers(StatusCode::OK.into_response(), state.mode)
}

/// Handle `GET /health`
async fn handle_health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "mode": state.mode.as_str(),
        "server": SERVER_NAME,
    }))
    .into_response()
}

/// CORS headers for the plain HTTP transport
static HTTP_CORS: [(HeaderName, &str); 3] = [
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Attach the mode's response headers
pub(crate) fn with_headers(mut response: Response, mode: TransportMode) -> Response {
    let headers = response.headers_mut();
    let extra: &[(HeaderName, &'static str)] = match mode {
        TransportMode::Sse => &sse::SSE_HEADERS,
        TransportMode::Http | TransportMode::Stdio => &HTTP_CORS,
    };
    for (name, value) in extra {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }
    response
}
