// ABOUTME: MCP tools for node (URL) CRUD and lookup by URL
// ABOUTME: Nodes are addressed by composite ids of the form tool:domain:id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use urldb::types::{NewNode, Node, NodeUpdate, Page};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args::{self, lenient_int};
use crate::tools::{definition, McpTool, ToolError};

/// A node as returned to clients, carrying its composite id
#[derive(Serialize)]
pub(crate) struct NodeView<'a> {
    pub composite_id: String,
    #[serde(flatten)]
    pub node: &'a Node,
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(ctx: &ToolContext, node: &'a Node) -> Result<Self, ToolError> {
        Ok(Self {
            composite_id: ctx.node_key(node)?,
            node,
        })
    }
}

/// Render a page of nodes as text plus a structured payload
pub(crate) fn render_node_page(
    ctx: &ToolContext,
    page: &Page<Node>,
    empty_message: String,
) -> Result<CallToolResult, ToolError> {
    let views = page
        .items
        .iter()
        .map(|node| NodeView::new(ctx, node))
        .collect::<Result<Vec<_>, _>>()?;

    let text = if views.is_empty() {
        empty_message
    } else {
        let mut blocks: Vec<String> = views
            .iter()
            .map(|view| {
                format!(
                    "Node ID: {}\nComposite ID: {}\nURL: {}\nTitle: {}\nDescription: {}\nCreated: {}",
                    view.node.id,
                    view.composite_id,
                    view.node.url,
                    view.node.title,
                    view.node.description,
                    args::timestamp(&view.node.created_at)
                )
            })
            .collect();
        blocks.push(format!(
            "Page {} of {} (Total: {} nodes)",
            page.page, page.total_pages, page.total_count
        ));
        blocks.join("\n\n")
    };

    let structured = json!({
        "nodes": views,
        "page": page.page,
        "size": page.size,
        "total_count": page.total_count,
        "total_pages": page.total_pages,
    });
    Ok(CallToolResult::text(text).with_structured(structured))
}

fn composite_id_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
        "pattern": "^[a-zA-Z0-9_-]+:[a-zA-Z0-9_-]+:[0-9]+$"
    })
}

#[derive(Deserialize)]
struct ListNodesArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    search: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    size: Option<i64>,
}

/// Lists nodes of a domain
pub struct ListNodes;

#[async_trait]
impl McpTool for ListNodes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_nodes",
            "List Nodes",
            "List URLs in domain (requires: domain must exist via create_domain)",
            args::with_paging(json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to list"
                    },
                    "search": {
                        "type": "string",
                        "description": "Case-insensitive filter over URL, title, and description"
                    }
                },
                "required": ["domain_name"]
            })),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: ListNodesArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let (page, size) = args::page_and_size(input.page, input.size);
        let search = input.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let result = ctx.store().list_nodes(domain, page, size, search).await?;
        render_node_page(ctx, &result, format!("No nodes found in domain '{domain}'"))
    }
}

#[derive(Deserialize)]
struct CreateNodeArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Adds a URL to a domain
pub struct CreateNode;

#[async_trait]
impl McpTool for CreateNode {
    fn definition(&self) -> ToolDefinition {
        definition(
            "create_node",
            "Create Node",
            "Add URL to domain (requires: domain must exist via create_domain; returns the composite_id used by other node tools)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to add the URL to"
                    },
                    "url": {
                        "type": "string",
                        "description": "URL to store (unique within the domain)"
                    },
                    "title": {
                        "type": "string",
                        "description": "Display title"
                    },
                    "description": {
                        "type": "string",
                        "description": "Free-form description"
                    }
                },
                "required": ["domain_name", "url"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CreateNodeArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let url = args::required(&input.url, "url")?;

        let node = ctx
            .store()
            .create_node(
                domain,
                NewNode {
                    url: url.to_owned(),
                    title: input.title,
                    description: input.description,
                },
            )
            .await?;
        let view = NodeView::new(ctx, &node)?;

        let text = format!(
            "Successfully created node in domain '{}'\nComposite ID: {}\nURL: {}\nTitle: {}\nDescription: {}\nCreated: {}",
            node.domain_name,
            view.composite_id,
            node.url,
            node.title,
            node.description,
            args::timestamp(&node.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct CompositeIdArgs {
    #[serde(default)]
    composite_id: String,
}

/// Fetches one node
pub struct GetNode;

#[async_trait]
impl McpTool for GetNode {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_node",
            "Get Node",
            "Get URL details (requires: node must exist via create_node; use composite_id from create_node)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": composite_id_schema("Node composite id (tool:domain:id)")
                },
                "required": ["composite_id"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CompositeIdArgs = args::parse(arguments)?;
        let node = ctx.resolve_node(&input.composite_id, "composite_id").await?;
        let view = NodeView::new(ctx, &node)?;

        let text = format!(
            "Node ID: {}\nComposite ID: {}\nURL: {}\nTitle: {}\nDescription: {}\nCreated: {}\nUpdated: {}",
            node.id,
            view.composite_id,
            node.url,
            node.title,
            node.description,
            args::timestamp(&node.created_at),
            args::timestamp(&node.updated_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct UpdateNodeArgs {
    #[serde(default)]
    composite_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Updates a node's title or description
pub struct UpdateNode;

#[async_trait]
impl McpTool for UpdateNode {
    fn definition(&self) -> ToolDefinition {
        definition(
            "update_node",
            "Update Node",
            "Update URL title or description (requires: node must exist via create_node; use composite_id from create_node)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": composite_id_schema("Node composite id (tool:domain:id)"),
                    "title": {
                        "type": "string",
                        "description": "New title"
                    },
                    "description": {
                        "type": "string",
                        "description": "New description"
                    }
                },
                "required": ["composite_id"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: UpdateNodeArgs = args::parse(arguments)?;
        let update = NodeUpdate {
            title: input.title,
            description: input.description,
        };
        if update.is_empty() {
            return Err(ToolError::invalid_arguments(
                "at least one of title or description is required",
            ));
        }

        let node = ctx.resolve_node(&input.composite_id, "composite_id").await?;
        let node = ctx.store().update_node(node.id, update).await?;
        let view = NodeView::new(ctx, &node)?;

        let text = format!(
            "Successfully updated node:\nComposite ID: {}\nURL: {}\nTitle: {}\nDescription: {}\nUpdated: {}",
            view.composite_id,
            node.url,
            node.title,
            node.description,
            args::timestamp(&node.updated_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

/// Deletes a node along with its attribute values and dependency edges
pub struct DeleteNode;

#[async_trait]
impl McpTool for DeleteNode {
    fn definition(&self) -> ToolDefinition {
        definition(
            "delete_node",
            "Delete Node",
            "Remove URL (requires: node must exist via create_node; use composite_id from create_node; dependents linked with cascade_delete are removed too)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": composite_id_schema("Node composite id (tool:domain:id)")
                },
                "required": ["composite_id"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CompositeIdArgs = args::parse(arguments)?;
        let node = ctx.resolve_node(&input.composite_id, "composite_id").await?;
        let composite_id = ctx.node_key(&node)?;
        let deleted = ctx.store().delete_node(node.id).await?;

        Ok(CallToolResult::text(format!(
            "Successfully deleted node:\nComposite ID: {composite_id}\nURL: {}\nTitle: {}",
            deleted.url, deleted.title
        )))
    }
}

#[derive(Deserialize)]
struct FindNodeArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    url: String,
}

/// Finds a node by its exact URL
pub struct FindNodeByUrl;

#[async_trait]
impl McpTool for FindNodeByUrl {
    fn definition(&self) -> ToolDefinition {
        definition(
            "find_node_by_url",
            "Find Node By URL",
            "Search by exact URL (requires: domain must exist via create_domain; returns composite_id if found)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to search"
                    },
                    "url": {
                        "type": "string",
                        "description": "Exact URL to find"
                    }
                },
                "required": ["domain_name", "url"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: FindNodeArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let url = args::required(&input.url, "url")?;

        let node = ctx.store().find_node_by_url(domain, url).await?;
        let view = NodeView::new(ctx, &node)?;

        let text = format!(
            "Found node:\nComposite ID: {}\nURL: {}\nTitle: {}\nDescription: {}\nCreated: {}",
            view.composite_id,
            node.url,
            node.title,
            node.description,
            args::timestamp(&node.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use urldb::{MemoryStore, ServerConfig};

    use super::*;
    use crate::tools::ToolErrorKind;
    use crate::tools::domain::CreateDomain;

    fn context() -> ToolContext {
        ToolContext::new(Arc::new(MemoryStore::new()), &ServerConfig::default())
    }

    async fn create(ctx: &ToolContext, url: &str) -> String {
        let result = CreateNode
            .execute(ctx, json!({"domain_name": "Tech Articles", "url": url}))
            .await
            .expect("create node");
        result.structured_content.expect("structured")["composite_id"]
            .as_str()
            .expect("composite id")
            .to_owned()
    }

    async fn seeded() -> ToolContext {
        let ctx = context();
        CreateDomain
            .execute(&ctx, json!({"name": "Tech Articles", "description": "Reading list"}))
            .await
            .expect("domain");
        ctx
    }

    #[tokio::test]
    async fn create_then_get_by_composite_id() {
        let ctx = seeded().await;
        let id = create(&ctx, "https://rust-lang.org").await;
        assert!(id.starts_with("url-db:tech-articles:"));

        let result = GetNode
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect("get");
        assert!(result.joined_text().contains("URL: https://rust-lang.org"));
    }

    #[tokio::test]
    async fn list_nodes_paginates_and_searches() {
        let ctx = seeded().await;
        for i in 0..3 {
            create(&ctx, &format!("https://example.com/{i}")).await;
        }
        create(&ctx, "https://docs.rs").await;

        let result = ListNodes
            .execute(&ctx, json!({"domain_name": "tech-articles", "size": 2, "page": 2}))
            .await
            .expect("list");
        let structured = result.structured_content.expect("structured");
        assert_eq!(structured["total_count"], 4);
        assert_eq!(structured["nodes"].as_array().map(Vec::len), Some(2));

        let result = ListNodes
            .execute(&ctx, json!({"domain_name": "tech-articles", "search": "DOCS"}))
            .await
            .expect("search");
        assert_eq!(result.structured_content.expect("structured")["total_count"], 1);
    }

    #[tokio::test]
    async fn update_requires_a_change() {
        let ctx = seeded().await;
        let id = create(&ctx, "https://example.com").await;

        let err = UpdateNode
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect_err("empty update");
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);

        let result = UpdateNode
            .execute(&ctx, json!({"composite_id": id, "title": "Example"}))
            .await
            .expect("update");
        assert!(result.joined_text().contains("Title: Example"));
    }

    #[tokio::test]
    async fn delete_then_lookup_fails() {
        let ctx = seeded().await;
        let id = create(&ctx, "https://example.com").await;

        DeleteNode
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect("delete");
        let err = GetNode
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect_err("gone");
        assert_eq!(err.kind, ToolErrorKind::Execution);
    }

    #[tokio::test]
    async fn find_by_url_returns_composite_id() {
        let ctx = seeded().await;
        let id = create(&ctx, "https://example.com/a").await;

        let result = FindNodeByUrl
            .execute(
                &ctx,
                json!({"domain_name": "tech-articles", "url": "https://example.com/a"}),
            )
            .await
            .expect("find");
        assert_eq!(result.structured_content.expect("structured")["composite_id"], id);
    }

    #[tokio::test]
    async fn missing_url_fails_before_side_effects() {
        let ctx = seeded().await;
        let err = CreateNode
            .execute(&ctx, json!({"domain_name": "tech-articles", "url": "  "}))
            .await
            .expect_err("blank url");
        assert_eq!(err.message, "missing required argument: url");

        let listed = ListNodes
            .execute(&ctx, json!({"domain_name": "tech-articles"}))
            .await
            .expect("list");
        assert_eq!(listed.structured_content.expect("structured")["total_count"], 0);
    }
}
