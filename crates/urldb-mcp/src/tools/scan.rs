// ABOUTME: MCP tool that pages through a whole domain sized by a token budget
// ABOUTME: Renders a compact summary and returns the full scan page as structured content
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use urldb::scanner::{scan_all_content, ScanRequest, ScanResponse};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args::{self, lenient_int};
use crate::tools::{definition, McpTool, ToolError};

/// Items listed in the text rendering; the rest stay in structured content
const PREVIEW_ITEMS: usize = 10;

#[derive(Deserialize)]
struct ScanArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default, deserialize_with = "lenient_int")]
    max_tokens_per_page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default = "args::default_true")]
    include_attributes: bool,
    #[serde(default)]
    compress_attributes: bool,
}

/// Scans all nodes of a domain one token-budgeted page at a time
pub struct ScanAllContent;

#[async_trait]
impl McpTool for ScanAllContent {
    fn definition(&self) -> ToolDefinition {
        definition(
            "scan_all_content",
            "Scan All Content",
            "Retrieve all URLs and their attributes from a domain using page-based navigation with token optimization for AI processing (requires: domain must exist via create_domain)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to scan"
                    },
                    "max_tokens_per_page": {
                        "type": "integer",
                        "description": "Approximate token budget per page (default 3000, max 5000)",
                        "minimum": 1,
                        "maximum": 5000
                    },
                    "page": {
                        "type": "integer",
                        "description": "Page number starting from 1",
                        "minimum": 1
                    },
                    "include_attributes": {
                        "type": "boolean",
                        "description": "Attach attribute values to each node (default true)"
                    },
                    "compress_attributes": {
                        "type": "boolean",
                        "description": "Remove duplicate attribute values and report a summary (default false)"
                    }
                },
                "required": ["domain_name"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: ScanArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;

        let request = ScanRequest {
            domain_name: domain.to_owned(),
            max_tokens_per_page: input.max_tokens_per_page.unwrap_or(0),
            page: input.page.unwrap_or(1),
            include_attributes: input.include_attributes,
            compress_attributes: input.compress_attributes,
        };
        let response = scan_all_content(ctx.store(), ctx.codec(), &request).await?;

        Ok(CallToolResult::text(render(&response)).with_structured(args::structured(&response)?))
    }
}

fn render(response: &ScanResponse) -> String {
    let pagination = &response.pagination;
    let metadata = &response.metadata;

    let mut text = String::from("📊 **Content Scan Results**\n\n");
    let _ = writeln!(
        text,
        "**Page**: {}/{} ({} tokens)",
        pagination.current_page, pagination.total_pages, pagination.current_tokens
    );
    let _ = writeln!(
        text,
        "**Items**: {}/{} nodes",
        metadata.processed_nodes, metadata.total_nodes
    );

    if pagination.has_previous || pagination.has_more {
        let mut nav = Vec::new();
        if pagination.has_previous {
            nav.push(format!("← Page {}", pagination.current_page - 1));
        }
        if pagination.has_more {
            nav.push(format!("Page {} →", pagination.current_page + 1));
        }
        let _ = writeln!(text, "**Navigation**: {}", nav.join(" | "));
    }

    if metadata.compressed_output {
        let removed = metadata
            .attribute_summary
            .as_ref()
            .map_or(0, |s| s.total_duplicates_removed);
        let _ = writeln!(text, "**Compression**: {removed} duplicate attribute values removed");
    }

    if response.items.is_empty() {
        text.push_str("\nNo nodes found in this domain.");
        return text;
    }

    text.push_str("\n**Content**:");
    for (i, item) in response.items.iter().take(PREVIEW_ITEMS).enumerate() {
        let _ = write!(text, "\n{}. **{}**", i + 1, item.content);
        if let Some(title) = &item.title {
            let _ = write!(text, " - *{title}*");
        }
        if let Some(attributes) = item.attributes.as_ref().filter(|a| !a.is_empty()) {
            let _ = write!(text, " [{} attributes]", attributes.len());
        }
    }
    if response.items.len() > PREVIEW_ITEMS {
        let _ = write!(
            text,
            "\n... and {} more items",
            response.items.len() - PREVIEW_ITEMS
        );
    }

    if let Some(summary) = metadata
        .attribute_summary
        .as_ref()
        .filter(|s| !s.most_common_values.is_empty())
    {
        text.push_str("\n\n**Most Common Values**:");
        for (name, value) in &summary.most_common_values {
            let count = summary
                .value_counts
                .get(&format!("{name}:{value}"))
                .copied()
                .unwrap_or_default();
            let _ = write!(text, "\n- {name}: '{value}' ({count} times)");
        }
    }

    text
}
