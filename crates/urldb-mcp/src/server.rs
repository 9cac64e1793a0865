// ABOUTME: MCP server core that routes JSON-RPC requests to protocol handlers and tools
// ABOUTME: Implements initialize, tools/list, tools/call, resources, and ping with per-call timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use urldb::{ServerConfig, UrlStore};

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ResourcesListResult, ServerCapabilities, ServerInfo, ToolsListResult, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PROTOCOL_VERSION,
    SERVER_NAME, SERVER_VERSION,
};
use crate::state::{SharedContext, ToolContext};
use crate::tools::{build_tool_registry, ToolError, ToolErrorKind, ToolRegistry};
use crate::transport::RequestHandler;

/// Methods answered by the dispatcher, reported with `Method not found`
pub const VALID_METHODS: [&str; 6] = [
    "initialize",
    "tools/list",
    "tools/call",
    "resources/list",
    "resources/read",
    "ping",
];

/// Notification sent by clients once the handshake completes
const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

/// MCP server that dispatches JSON-RPC requests to the appropriate handler
///
/// Owns the shared tool context and the tool registry. Transport layers feed
/// parsed requests into `handle_request` and send the returned responses.
pub struct McpServer {
    context: SharedContext,
    tools: ToolRegistry,
    tool_timeout: Duration,
}

impl McpServer {
    /// Create a server with the given context, tool registry, and per-call deadline
    pub const fn new(context: SharedContext, tools: ToolRegistry, tool_timeout: Duration) -> Self {
        Self {
            context,
            tools,
            tool_timeout,
        }
    }

    /// Build a server over `store` with the full tool catalog and the configured deadline
    ///
    /// Rejects a tool name that cannot prefix composite keys before any
    /// request is served.
    pub fn from_config(store: Arc<dyn UrlStore>, config: &ServerConfig) -> Result<Self, ToolError> {
        config.normalized_tool_name()?;
        let context = Arc::new(ToolContext::new(store, config));
        Ok(Self::new(context, build_tool_registry()?, config.tool_timeout))
    }

    /// The registered tools
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Route a JSON-RPC request to the appropriate MCP handler
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Checked before the notification rule so a bad id-less envelope is still answered
        if request.jsonrpc != JSONRPC_VERSION {
            warn!(version = %request.jsonrpc, "Rejecting request with unsupported JSON-RPC version");
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Invalid JSON-RPC version: '{}'", request.jsonrpc),
            ));
        }

        if request.method == INITIALIZED_NOTIFICATION {
            info!("MCP client initialized");
            return None;
        }

        if request.id.is_none() {
            debug!(method = %request.method, "Received notification, no response");
            return None;
        }

        debug!(method = %request.method, "Dispatching MCP request");

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id, request.params),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "resources/list" => serialize_result(request.id, &ResourcesListResult::default()),
            "resources/read" => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                "Resource reading not implemented",
            ),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            method => {
                debug!(method, "Unknown MCP method");
                JsonRpcResponse::error_with_data(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                    Some(json!({ "valid_methods": VALID_METHODS })),
                )
            }
        };

        Some(response)
    }

    /// Handle `initialize`: log client info and return server capabilities
    fn handle_initialize(id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let Some(init) = params.and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
        {
            if let Some(client) = &init.client_info {
                info!(
                    client = %client.name,
                    version = ?client.version,
                    protocol = ?init.protocol_version,
                    "MCP client connected"
                );
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_owned(),
                version: SERVER_VERSION.to_owned(),
            },
        };
        serialize_result(id, &result)
    }

    /// Handle `tools/list`: return all registered tool definitions
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.tools.list_definitions(),
        };
        serialize_result(id, &result)
    }

    /// Handle `tools/call`: dispatch to the named tool under the per-call deadline
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let call_params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(cp) => cp,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params for tools/call");
            }
        };

        let name = call_params.name;
        let arguments = call_params.arguments.unwrap_or_else(|| json!({}));

        let outcome = tokio::time::timeout(
            self.tool_timeout,
            self.tools.execute(&name, &self.context, arguments),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => serialize_result(id, &result),
            Ok(Err(err)) if err.kind == ToolErrorKind::UnknownTool => {
                debug!(tool = %name, "Unknown tool requested");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, err.message)
            }
            Ok(Err(err)) => {
                debug!(tool = %name, error = %err, "Tool execution failed");
                tool_failure(id, err.message)
            }
            Err(_) => {
                warn!(tool = %name, timeout = ?self.tool_timeout, "Tool call timed out");
                tool_failure(
                    id,
                    format!(
                        "tool '{name}' timed out after {}s",
                        self.tool_timeout.as_secs_f64()
                    ),
                )
            }
        }
    }
}

#[async_trait]
impl RequestHandler for McpServer {
    async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.handle_request(request).await
    }
}

fn tool_failure(id: Option<Value>, message: String) -> JsonRpcResponse {
    JsonRpcResponse::error_with_data(
        id,
        INTERNAL_ERROR,
        "Tool execution failed",
        Some(Value::String(message)),
    )
}

fn serialize_result<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use urldb::MemoryStore;

    use super::*;
    use crate::protocol::{CallToolResult, ToolDefinition};
    use crate::tools::{definition, McpTool};

    fn context() -> SharedContext {
        Arc::new(ToolContext::new(
            Arc::new(MemoryStore::new()),
            &ServerConfig::default(),
        ))
    }

    fn server() -> McpServer {
        McpServer::from_config(Arc::new(MemoryStore::new()), &ServerConfig::default())
            .expect("catalog")
    }

    fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            Some(json!(id)),
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        )
    }

    struct SlowTool;

    #[async_trait]
    impl McpTool for SlowTool {
        fn definition(&self) -> ToolDefinition {
            definition("slow", "Slow", "Sleeps for a minute", json!({"type": "object"}))
        }

        async fn execute(
            &self,
            _ctx: &ToolContext,
            _arguments: Value,
        ) -> Result<CallToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CallToolResult::text("done"))
        }
    }

    #[tokio::test]
    async fn initialize_reports_capabilities() {
        let response = server()
            .handle_request(JsonRpcRequest::new(
                Some(json!(1)),
                "initialize",
                Some(json!({"protocolVersion": PROTOCOL_VERSION, "clientInfo": {"name": "test"}})),
            ))
            .await
            .expect("response");
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(result["capabilities"]["resources"]["subscribe"], true);
    }

    #[tokio::test]
    async fn wrong_version_is_answered_even_without_id() {
        let mut request = JsonRpcRequest::new(None, "initialize", None);
        request.jsonrpc = "1.0".to_owned();
        let response = server().handle_request(request).await.expect("response");
        assert_eq!(response.error_code(), Some(INVALID_REQUEST));
        assert!(response.id.is_none());

        let mut request = JsonRpcRequest::new(Some(json!("abc")), "initialize", None);
        request.jsonrpc = String::new();
        let response = server().handle_request(request).await.expect("response");
        assert_eq!(response.error_code(), Some(INVALID_REQUEST));
        assert_eq!(response.id, Some(json!("abc")));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let server = server();
        let initialized = JsonRpcRequest::new(None, INITIALIZED_NOTIFICATION, None);
        assert!(server.handle_request(initialized).await.is_none());

        let other = JsonRpcRequest::new(None, "tools/list", None);
        assert!(server.handle_request(other).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_lists_valid_methods() {
        let response = server()
            .handle_request(JsonRpcRequest::new(Some(json!(7)), "prompts/list", None))
            .await
            .expect("response");
        let error = response.error.expect("error");
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: prompts/list");
        assert_eq!(error.data.expect("data")["valid_methods"][0], "initialize");
    }

    #[tokio::test]
    async fn resources_and_ping() {
        let server = server();
        let listed = server
            .handle_request(JsonRpcRequest::new(Some(json!(1)), "resources/list", None))
            .await
            .expect("response");
        assert_eq!(listed.result, Some(json!({"resources": []})));

        let read = server
            .handle_request(JsonRpcRequest::new(Some(json!(2)), "resources/read", None))
            .await
            .expect("response");
        assert_eq!(read.error_code(), Some(METHOD_NOT_FOUND));

        let ping = server
            .handle_request(JsonRpcRequest::new(Some(json!(3)), "ping", None))
            .await
            .expect("response");
        assert_eq!(ping.result, Some(json!({})));
    }

    #[tokio::test]
    async fn tools_list_matches_registry() {
        let server = server();
        let response = server
            .handle_request(JsonRpcRequest::new(Some(json!(1)), "tools/list", None))
            .await
            .expect("response");
        let result = response.result.expect("result");
        let listed: Vec<&str> = result["tools"]
            .as_array()
            .expect("tools")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        let registered: Vec<&str> = server.tools().names().collect();
        assert_eq!(listed, registered);
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let response = server()
            .handle_request(call(1, "fly_to_moon", json!({})))
            .await
            .expect("response");
        let error = response.error.expect("error");
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("fly_to_moon"));
    }

    #[tokio::test]
    async fn bad_call_params_are_invalid_params() {
        let server = server();
        let missing = server
            .handle_request(JsonRpcRequest::new(Some(json!(1)), "tools/call", None))
            .await
            .expect("response");
        assert_eq!(missing.error_code(), Some(INVALID_PARAMS));

        let malformed = server
            .handle_request(JsonRpcRequest::new(
                Some(json!(2)),
                "tools/call",
                Some(json!({"arguments": {}})),
            ))
            .await
            .expect("response");
        assert_eq!(malformed.error_code(), Some(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn tool_errors_carry_message_in_data() {
        let response = server()
            .handle_request(call(1, "create_domain", json!({"name": "docs"})))
            .await
            .expect("response");
        let error = response.error.expect("error");
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.message, "Tool execution failed");
        assert_eq!(
            error.data,
            Some(json!("missing required argument: description"))
        );
    }

    #[test]
    fn unusable_tool_name_is_rejected_at_startup() {
        let config = ServerConfig::default().with_tool_name("!!!");
        let err = McpServer::from_config(Arc::new(MemoryStore::new()), &config)
            .err()
            .expect("rejected");
        assert!(err.message.starts_with("invalid tool name '!!!'"));
    }

    #[tokio::test]
    async fn server_info_reports_normalized_prefix() {
        let config = ServerConfig::default().with_tool_name("Team Links");
        let server = McpServer::from_config(Arc::new(MemoryStore::new()), &config)
            .expect("catalog");
        let response = server
            .handle_request(call(1, "get_server_info", json!({})))
            .await
            .expect("response");
        let result = response.result.expect("result");
        assert_eq!(result["structuredContent"]["tool_name"], "team-links");

        server
            .handle_request(call(
                2,
                "create_domain",
                json!({"name": "docs", "description": "Docs"}),
            ))
            .await
            .expect("response");
        let created = server
            .handle_request(call(
                3,
                "create_node",
                json!({"domain_name": "docs", "url": "https://a.example"}),
            ))
            .await
            .expect("response");
        let result = created.result.expect("result");
        assert_eq!(result["structuredContent"]["composite_id"], "team-links:docs:1");
    }

    #[tokio::test]
    async fn huge_page_numbers_return_empty_pages() {
        let server = server();
        server
            .handle_request(call(
                1,
                "create_domain",
                json!({"name": "docs", "description": "Docs"}),
            ))
            .await
            .expect("response");
        server
            .handle_request(call(
                2,
                "create_node",
                json!({"domain_name": "docs", "url": "https://a.example"}),
            ))
            .await
            .expect("response");

        let listed = server
            .handle_request(call(3, "list_domains", json!({"page": i64::MAX, "size": 20})))
            .await
            .expect("response");
        let result = listed.result.expect("result");
        assert_eq!(result["structuredContent"]["items"], json!([]));
        assert_eq!(result["structuredContent"]["total_count"], 1);

        let scanned = server
            .handle_request(call(
                4,
                "scan_all_content",
                json!({"domain_name": "docs", "page": i64::MAX}),
            ))
            .await
            .expect("response");
        let result = scanned.result.expect("result");
        assert_eq!(result["structuredContent"]["items"], json!([]));
        assert_eq!(result["structuredContent"]["metadata"]["total_nodes"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tools_time_out() {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(SlowTool)).expect("register");
        let server = McpServer::new(context(), tools, Duration::from_millis(1500));

        let response = server
            .handle_request(call(9, "slow", json!({})))
            .await
            .expect("response");
        let error = response.error.expect("error");
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.data, Some(json!("tool 'slow' timed out after 1.5s")));
        assert_eq!(response.id, Some(json!(9)));
    }
}
