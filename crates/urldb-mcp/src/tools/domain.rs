// ABOUTME: MCP tools for listing and creating domains
// ABOUTME: Domain names are normalized into key-safe segments on creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use urldb::types::Domain;

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args::{self, PagingArgs};
use crate::tools::{definition, McpTool, ToolError};

fn domain_summary(domain: &Domain) -> String {
    format!(
        "Domain: {}\nDescription: {}\nCreated: {}",
        domain.name,
        domain.description,
        args::timestamp(&domain.created_at)
    )
}

/// Lists every domain with pagination
pub struct ListDomains;

#[async_trait]
impl McpTool for ListDomains {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_domains",
            "List Domains",
            "Get all domains",
            args::with_paging(json!({
                "type": "object",
                "properties": {}
            })),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let paging: PagingArgs = args::parse(arguments)?;
        let (page, size) = paging.resolve();
        let result = ctx.store().list_domains(page, size).await?;

        let text = if result.items.is_empty() {
            "No domains found".to_owned()
        } else {
            result
                .items
                .iter()
                .map(domain_summary)
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        Ok(CallToolResult::text(text).with_structured(args::structured(&result)?))
    }
}

#[derive(Deserialize)]
struct CreateDomainArgs {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

/// Creates a new domain
pub struct CreateDomain;

#[async_trait]
impl McpTool for CreateDomain {
    fn definition(&self) -> ToolDefinition {
        definition(
            "create_domain",
            "Create Domain",
            "Create new domain for organizing URLs (the name is normalized to lowercase-hyphenated form, e.g. 'Tech Articles' becomes 'tech-articles')",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Domain name"
                    },
                    "description": {
                        "type": "string",
                        "description": "What URLs in this domain are about"
                    }
                },
                "required": ["name", "description"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CreateDomainArgs = args::parse(arguments)?;
        let name = args::required(&input.name, "name")?;
        let description = args::required(&input.description, "description")?;

        let domain = ctx.store().create_domain(name, description).await?;

        let text = format!(
            "Successfully created domain: {}\nDescription: {}\nCreated: {}",
            domain.name,
            domain.description,
            args::timestamp(&domain.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&domain)?))
    }
}
