// ABOUTME: MCP tool reporting server name, version, transport mode, and protocol version
// ABOUTME: Lets agents confirm which url-db server and composite key prefix they are talking to
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::protocol::{CallToolResult, ToolDefinition, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use crate::state::ToolContext;
use crate::tools::{definition, McpTool, ToolError};

/// Returns server identification and runtime mode
pub struct GetServerInfo;

#[async_trait]
impl McpTool for GetServerInfo {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_server_info",
            "Get Server Info",
            "Get server information",
            json!({
                "type": "object",
                "properties": {}
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        _arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let text = format!(
            "Server: {SERVER_NAME} v{SERVER_VERSION}\nMode: {}\nProtocol: MCP {PROTOCOL_VERSION}\nComposite key prefix: {}",
            ctx.mode(),
            ctx.codec().tool_name()
        );

        Ok(CallToolResult::text(text).with_structured(json!({
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "mode": ctx.mode(),
            "protocol_version": PROTOCOL_VERSION,
            "tool_name": ctx.codec().tool_name(),
        })))
    }
}
