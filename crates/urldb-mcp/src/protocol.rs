// ABOUTME: MCP JSON-RPC protocol types for request/response handling
// ABOUTME: Defines wire format for initialize, tools, resources, and error responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version supported by this server
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Server name reported during MCP handshake
pub const SERVER_NAME: &str = "url-db-mcp-server";

/// Server version reported during MCP handshake
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The only JSON-RPC version accepted
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// JSON-RPC Error Codes
// ============================================================================

/// JSON-RPC parse error: invalid JSON received
pub const PARSE_ERROR: i32 = -32_700;

/// JSON-RPC invalid request (e.g. wrong protocol version)
pub const INVALID_REQUEST: i32 = -32_600;

/// JSON-RPC method not found
pub const METHOD_NOT_FOUND: i32 = -32_601;

/// JSON-RPC invalid parameters
pub const INVALID_PARAMS: i32 = -32_602;

/// JSON-RPC internal error
pub const INTERNAL_ERROR: i32 = -32_603;

// ============================================================================
// JSON-RPC Messages
// ============================================================================

/// Incoming JSON-RPC request from MCP client
///
/// A missing `jsonrpc` field deserializes as an empty string so the
/// dispatcher can answer it with `INVALID_REQUEST` instead of a parse error.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker, must be "2.0"
    #[serde(default)]
    pub jsonrpc: String,
    /// Request identifier (None for notifications)
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the given id (use `None` for a notification)
    pub fn new(id: Option<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Outgoing JSON-RPC response to MCP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Matching request identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Success payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response with the given result
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response with the given code and message
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Build an error response carrying a diagnostic payload
    pub fn error_with_data(
        id: Option<Value>,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

// ============================================================================
// MCP Initialize
// ============================================================================

/// Parameters for the `initialize` request, only used for logging
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InitializeParams {
    /// Protocol version requested by the client
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    /// Client capabilities
    pub capabilities: Value,
    /// Client identification
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client identification sent during initialization
#[derive(Debug, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,
    /// Client version
    #[serde(default)]
    pub version: Option<String>,
}

/// Result of a successful `initialize` response
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// Protocol version the server supports
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Server identification
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server identification
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

/// Server capability declarations
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    /// Tool support
    pub tools: ToolsCapability,
    /// Resource support
    pub resources: ResourcesCapability,
}

/// Tool capability flags
#[derive(Debug, Serialize)]
pub struct ToolsCapability {
    /// The tool list may change during a session
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource capability flags
#[derive(Debug, Serialize)]
pub struct ResourcesCapability {
    /// Clients may subscribe to resource updates
    pub subscribe: bool,
    /// The resource list may change during a session
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: ToolsCapability { list_changed: true },
            resources: ResourcesCapability {
                subscribe: true,
                list_changed: true,
            },
        }
    }
}

// ============================================================================
// MCP Resources
// ============================================================================

/// Result of a `resources/list` call (always empty)
#[derive(Debug, Default, Serialize)]
pub struct ResourcesListResult {
    /// Available resources
    pub resources: Vec<Value>,
}

// ============================================================================
// MCP Tools
// ============================================================================

/// Tool definition exposed via `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Short display title
    pub title: String,
    /// Human-readable tool description, including preconditions
    pub description: String,
    /// JSON Schema describing the tool's input
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a `tools/list` call
#[derive(Debug, Serialize)]
pub struct ToolsListResult {
    /// Available tool definitions
    pub tools: Vec<ToolDefinition>,
}

/// Parameters for a `tools/call` request
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to invoke
    pub name: String,
    /// Tool arguments
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Result of a `tools/call` invocation
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    /// Response content parts
    pub content: Vec<ContentPart>,
    /// Whether this result represents an error
    #[serde(rename = "isError")]
    pub is_error: bool,
    /// Machine-readable copy of the result for list and create tools
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

/// A content part within a tool result
#[derive(Debug, Serialize)]
pub struct ContentPart {
    /// Content type (always "text")
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    pub text: String,
}

impl ContentPart {
    fn text(text: String) -> Self {
        Self {
            content_type: "text".to_owned(),
            text,
        }
    }
}

impl CallToolResult {
    /// Build a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(content.into())],
            is_error: false,
            structured_content: None,
        }
    }

    /// Build an error result with the given message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(message.into())],
            is_error: true,
            structured_content: None,
        }
    }

    /// Attach a structured payload
    #[must_use]
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }

    /// Concatenated text of every content part
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
