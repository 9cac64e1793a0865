// ABOUTME: MCP tools for dependency edges between nodes
// ABOUTME: Creates, lists (both directions), and deletes edges addressed by composite ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use urldb::types::{Dependency, DependencyType, NewDependency};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args;
use crate::tools::{definition, McpTool, ToolError};

/// An edge as returned to clients, with both endpoints as composite ids
#[derive(Serialize)]
struct DependencyView<'a> {
    dependent_composite_id: String,
    dependency_composite_id: String,
    #[serde(flatten)]
    dependency: &'a Dependency,
}

async fn view<'a>(
    ctx: &ToolContext,
    dependency: &'a Dependency,
) -> Result<DependencyView<'a>, ToolError> {
    let dependent = ctx.store().get_node(dependency.dependent_node_id).await?;
    let target = ctx.store().get_node(dependency.dependency_node_id).await?;
    Ok(DependencyView {
        dependent_composite_id: ctx.node_key(&dependent)?,
        dependency_composite_id: ctx.node_key(&target)?,
        dependency,
    })
}

fn dependency_line(view: &DependencyView<'_>) -> String {
    format!(
        "• [{}] {} -> {} ({}, cascade_delete: {}, cascade_update: {})",
        view.dependency.id,
        view.dependent_composite_id,
        view.dependency_composite_id,
        view.dependency.dependency_type,
        view.dependency.cascade_delete,
        view.dependency.cascade_update
    )
}

#[derive(Deserialize)]
struct CreateDependencyArgs {
    #[serde(default)]
    dependent_node_id: String,
    #[serde(default)]
    dependency_node_id: String,
    #[serde(default)]
    dependency_type: Option<DependencyType>,
    #[serde(default)]
    cascade_delete: bool,
    #[serde(default)]
    cascade_update: bool,
    #[serde(default)]
    description: String,
}

/// Links two nodes with a dependency edge
pub struct CreateDependency;

#[async_trait]
impl McpTool for CreateDependency {
    fn definition(&self) -> ToolDefinition {
        definition(
            "create_dependency",
            "Create Dependency",
            "Create dependency relationship between nodes (requires: both nodes must exist via create_node; use composite_ids from create_node)",
            json!({
                "type": "object",
                "properties": {
                    "dependent_node_id": {
                        "type": "string",
                        "description": "Composite id of the node that depends on the other"
                    },
                    "dependency_node_id": {
                        "type": "string",
                        "description": "Composite id of the node being depended upon"
                    },
                    "dependency_type": {
                        "type": "string",
                        "enum": ["hard", "soft", "reference"]
                    },
                    "cascade_delete": {
                        "type": "boolean",
                        "description": "Delete the dependent when the dependency is deleted (default false)"
                    },
                    "cascade_update": {
                        "type": "boolean",
                        "description": "Touch the dependent when the dependency is updated (default false)"
                    },
                    "description": {
                        "type": "string"
                    }
                },
                "required": ["dependent_node_id", "dependency_node_id", "dependency_type"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CreateDependencyArgs = args::parse(arguments)?;
        let dependency_type = input.dependency_type.ok_or_else(|| {
            ToolError::invalid_arguments("missing required argument: dependency_type")
        })?;
        let dependent = ctx
            .resolve_node(&input.dependent_node_id, "dependent_node_id")
            .await?;
        let target = ctx
            .resolve_node(&input.dependency_node_id, "dependency_node_id")
            .await?;

        let created = ctx
            .store()
            .create_dependency(NewDependency {
                dependent_node_id: dependent.id,
                dependency_node_id: target.id,
                dependency_type,
                cascade_delete: input.cascade_delete,
                cascade_update: input.cascade_update,
                description: input.description,
            })
            .await?;
        let view = view(ctx, &created).await?;

        let text = format!(
            "Successfully created dependency:\nID: {}\nDependent: {}\nDependency: {}\nType: {}\nCascade Delete: {}\nCascade Update: {}\nDescription: {}",
            created.id,
            view.dependent_composite_id,
            view.dependency_composite_id,
            created.dependency_type,
            created.cascade_delete,
            created.cascade_update,
            created.description
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct CompositeIdArgs {
    #[serde(default)]
    composite_id: String,
}

#[derive(Clone, Copy)]
enum Direction {
    Dependencies,
    Dependents,
}

async fn list_edges(
    ctx: &ToolContext,
    arguments: Value,
    direction: Direction,
) -> Result<CallToolResult, ToolError> {
    let input: CompositeIdArgs = args::parse(arguments)?;
    let node = ctx.resolve_node(&input.composite_id, "composite_id").await?;
    let edges = match direction {
        Direction::Dependencies => ctx.store().list_dependencies(node.id).await?,
        Direction::Dependents => ctx.store().list_dependents(node.id).await?,
    };

    let mut views = Vec::with_capacity(edges.len());
    for edge in &edges {
        views.push(view(ctx, edge).await?);
    }

    let label = match direction {
        Direction::Dependencies => "Dependencies",
        Direction::Dependents => "Dependents",
    };
    let body = if views.is_empty() {
        "None".to_owned()
    } else {
        views.iter().map(dependency_line).collect::<Vec<_>>().join("\n")
    };
    let text = format!("{label} for node: {}\nURL: {}\n\n{body}", node.title, node.url);

    let key = match direction {
        Direction::Dependencies => "dependencies",
        Direction::Dependents => "dependents",
    };
    Ok(CallToolResult::text(text).with_structured(json!({
        "composite_id": ctx.node_key(&node)?,
        key: args::structured(&views)?,
    })))
}

fn list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "composite_id": {
                "type": "string",
                "description": "Node composite id (tool:domain:id)"
            }
        },
        "required": ["composite_id"]
    })
}

/// Lists what a node depends on
pub struct ListNodeDependencies;

#[async_trait]
impl McpTool for ListNodeDependencies {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_node_dependencies",
            "List Node Dependencies",
            "List what a node depends on (requires: node must exist via create_node; dependencies created via create_dependency)",
            list_schema(),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        list_edges(ctx, arguments, Direction::Dependencies).await
    }
}

/// Lists what depends on a node
pub struct ListNodeDependents;

#[async_trait]
impl McpTool for ListNodeDependents {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_node_dependents",
            "List Node Dependents",
            "List what depends on a node (requires: node must exist via create_node; dependencies created via create_dependency)",
            list_schema(),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        list_edges(ctx, arguments, Direction::Dependents).await
    }
}

#[derive(Deserialize)]
struct DeleteDependencyArgs {
    #[serde(default)]
    dependency_id: Value,
}

/// Deletes one dependency edge by id
pub struct DeleteDependency;

#[async_trait]
impl McpTool for DeleteDependency {
    fn definition(&self) -> ToolDefinition {
        definition(
            "delete_dependency",
            "Delete Dependency",
            "Remove dependency relationship (requires: dependency must exist via create_dependency; use dependency_id from list_node_dependencies)",
            json!({
                "type": "object",
                "properties": {
                    "dependency_id": {
                        "type": ["integer", "string"],
                        "description": "Numeric id of the dependency edge"
                    }
                },
                "required": ["dependency_id"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: DeleteDependencyArgs = args::parse(arguments)?;
        let id = args::positive_id(&input.dependency_id, "dependency_id")?;
        let deleted = ctx.store().delete_dependency(id).await?;
        let view = view(ctx, &deleted).await?;

        Ok(CallToolResult::text(format!(
            "Successfully deleted dependency:\nID: {}\nDependent: {}\nDependency: {}\nType: {}",
            deleted.id,
            view.dependent_composite_id,
            view.dependency_composite_id,
            deleted.dependency_type
        ))
        .with_structured(args::structured(&view)?))
    }
}
