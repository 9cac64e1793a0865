// ABOUTME: MCP tools for domain attribute definitions and node attribute values
// ABOUTME: Covers attribute CRUD, value assignment, attribute filtering, and node-with-attributes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use urldb::types::{
    Attribute, AttributeFilter, AttributeType, AttributeValueInput, NodeAttribute,
    ALL_ATTRIBUTE_TYPES,
};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args::{self, lenient_int};
use crate::tools::node::{render_node_page, NodeView};
use crate::tools::{definition, McpTool, ToolError};

fn attribute_type_names() -> Vec<&'static str> {
    ALL_ATTRIBUTE_TYPES.iter().map(AttributeType::as_str).collect()
}

fn value_line(value: &NodeAttribute) -> String {
    let mut line = format!("• {} ({}): {}", value.name, value.attribute_type, value.value);
    if let Some(order) = value.order_index {
        line.push_str(&format!(" [order: {order}]"));
    }
    line
}

fn attribute_details(attribute: &Attribute) -> String {
    format!(
        "Name: {}\nType: {}\nDescription: {}",
        attribute.name, attribute.attribute_type, attribute.description
    )
}

fn node_composite_schema() -> Value {
    json!({
        "type": "string",
        "description": "Node composite id (tool:domain:id)"
    })
}

#[derive(Deserialize)]
struct CompositeIdArgs {
    #[serde(default)]
    composite_id: String,
}

// ============================================================================
// Node attribute values
// ============================================================================

/// Lists the attribute values of a node
pub struct GetNodeAttributes;

#[async_trait]
impl McpTool for GetNodeAttributes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_node_attributes",
            "Get Node Attributes",
            "Get URL tags and attributes (requires: node must exist via create_node; attributes defined via create_domain_attribute)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": node_composite_schema()
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
        let values = ctx.store().get_node_attributes(node.id).await?;

        let text = if values.is_empty() {
            format!(
                "No attributes found for node: {}\nURL: {}",
                node.title, node.url
            )
        } else {
            format!(
                "Attributes for node: {}\nURL: {}\n\n{}",
                node.title,
                node.url,
                values.iter().map(value_line).collect::<Vec<_>>().join("\n")
            )
        };

        Ok(CallToolResult::text(text).with_structured(json!({
            "composite_id": ctx.node_key(&node)?,
            "attributes": args::structured(&values)?,
        })))
    }
}

#[derive(Deserialize)]
struct SetNodeAttributesArgs {
    #[serde(default)]
    composite_id: String,
    #[serde(default)]
    attributes: Vec<AttributeValueInput>,
    #[serde(default)]
    auto_create_attributes: Option<bool>,
}

/// Replaces the values of the named attributes on a node
pub struct SetNodeAttributes;

#[async_trait]
impl McpTool for SetNodeAttributes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "set_node_attributes",
            "Set Node Attributes",
            "Add or update URL tags (requires: node must exist via create_node; attributes should be defined via create_domain_attribute unless auto_create_attributes=true)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": node_composite_schema(),
                    "attributes": {
                        "type": "array",
                        "description": "Values to set; each named attribute's previous values are replaced",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "value": {"type": "string"},
                                "order_index": {
                                    "type": "integer",
                                    "description": "Required for ordered_tag attributes"
                                }
                            },
                            "required": ["name", "value"]
                        }
                    },
                    "auto_create_attributes": {
                        "type": "boolean",
                        "description": "Create unknown attributes as tag type (default true)"
                    }
                },
                "required": ["composite_id", "attributes"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: SetNodeAttributesArgs = args::parse(arguments)?;
        if input.attributes.is_empty() {
            return Err(ToolError::invalid_arguments(
                "missing required argument: attributes",
            ));
        }
        let count = input.attributes.len();
        let auto_create = input
            .auto_create_attributes
            .unwrap_or_else(|| ctx.auto_create_attributes());

        let node = ctx.resolve_node(&input.composite_id, "composite_id").await?;
        let values = ctx
            .store()
            .set_node_attributes(node.id, input.attributes, auto_create)
            .await?;

        let text = format!(
            "Successfully set {count} attributes for node: {}\nURL: {}",
            node.title, node.url
        );
        Ok(CallToolResult::text(text).with_structured(json!({
            "composite_id": ctx.node_key(&node)?,
            "attributes": args::structured(&values)?,
        })))
    }
}

// ============================================================================
// Domain attribute definitions
// ============================================================================

#[derive(Deserialize)]
struct DomainArgs {
    #[serde(default)]
    domain_name: String,
}

/// Lists the attribute definitions of a domain
pub struct ListDomainAttributes;

#[async_trait]
impl McpTool for ListDomainAttributes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_domain_attributes",
            "List Domain Attributes",
            "Get available tag types for domain (requires: domain must exist via create_domain)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain whose attributes to list"
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
        let input: DomainArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let attributes = ctx.store().list_attributes(domain).await?;

        let text = if attributes.is_empty() {
            format!("No attributes defined for domain '{domain}'")
        } else {
            attributes
                .iter()
                .map(|a| {
                    format!(
                        "Attribute: {}\nType: {}\nDescription: {}\nCreated: {}",
                        a.name,
                        a.attribute_type,
                        a.description,
                        args::timestamp(&a.created_at)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        Ok(CallToolResult::text(text).with_structured(json!({
            "domain_name": domain,
            "attributes": args::structured(&attributes)?,
        })))
    }
}

#[derive(Deserialize)]
struct CreateAttributeArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    attribute_type: String,
    #[serde(default)]
    description: String,
}

/// Defines a new attribute in a domain
pub struct CreateDomainAttribute;

#[async_trait]
impl McpTool for CreateDomainAttribute {
    fn definition(&self) -> ToolDefinition {
        definition(
            "create_domain_attribute",
            "Create Domain Attribute",
            "Define new tag type for domain (requires: domain must exist via create_domain; enables attributes for set_node_attributes)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to define the attribute in"
                    },
                    "name": {
                        "type": "string",
                        "description": "Attribute name (unique within the domain)"
                    },
                    "type": {
                        "type": "string",
                        "description": "Value type",
                        "enum": attribute_type_names()
                    },
                    "description": {
                        "type": "string",
                        "description": "What the attribute records"
                    }
                },
                "required": ["domain_name", "name", "type"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CreateAttributeArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let name = args::required(&input.name, "name")?;
        let raw_type = args::required(&input.attribute_type, "type")?;
        let attribute_type = AttributeType::parse(raw_type).ok_or_else(|| {
            ToolError::invalid_arguments(format!(
                "invalid attribute type '{raw_type}'. Valid: {}",
                attribute_type_names().join(", ")
            ))
        })?;

        let attribute = ctx
            .store()
            .create_attribute(domain, name, attribute_type, input.description.trim())
            .await?;

        let text = format!(
            "Successfully created domain attribute:\nDomain: {domain}\n{}\nCreated: {}",
            attribute_details(&attribute),
            args::timestamp(&attribute.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&attribute)?))
    }
}

#[derive(Deserialize)]
struct AttributeNameArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    attribute_name: String,
}

impl AttributeNameArgs {
    fn resolve(&self) -> Result<(&str, &str), ToolError> {
        Ok((
            args::required(&self.domain_name, "domain_name")?,
            args::required(&self.attribute_name, "attribute_name")?,
        ))
    }
}

fn attribute_name_schema(extra: Option<(&str, Value)>) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "domain_name": {
                "type": "string",
                "description": "Domain owning the attribute"
            },
            "attribute_name": {
                "type": "string",
                "description": "Attribute name"
            }
        },
        "required": ["domain_name", "attribute_name"]
    });
    if let (Some((key, property)), Some(props)) = (
        extra,
        schema.get_mut("properties").and_then(Value::as_object_mut),
    ) {
        props.insert(key.to_owned(), property);
    }
    schema
}

/// Fetches one attribute definition
pub struct GetDomainAttribute;

#[async_trait]
impl McpTool for GetDomainAttribute {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_domain_attribute",
            "Get Domain Attribute",
            "Get details of a specific domain attribute (requires: attribute must exist via create_domain_attribute)",
            attribute_name_schema(None),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: AttributeNameArgs = args::parse(arguments)?;
        let (domain, name) = input.resolve()?;
        let attribute = ctx.store().get_attribute(domain, name).await?;

        let text = format!(
            "Domain Attribute Details:\nDomain: {domain}\n{}\nCreated: {}",
            attribute_details(&attribute),
            args::timestamp(&attribute.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&attribute)?))
    }
}

#[derive(Deserialize)]
struct UpdateAttributeArgs {
    #[serde(flatten)]
    target: AttributeNameArgs,
    #[serde(default)]
    description: Option<String>,
}

/// Updates an attribute's description
pub struct UpdateDomainAttribute;

#[async_trait]
impl McpTool for UpdateDomainAttribute {
    fn definition(&self) -> ToolDefinition {
        definition(
            "update_domain_attribute",
            "Update Domain Attribute",
            "Update domain attribute description (requires: attribute must exist via create_domain_attribute)",
            attribute_name_schema(Some((
                "description",
                json!({"type": "string", "description": "New description"}),
            ))),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: UpdateAttributeArgs = args::parse(arguments)?;
        let (domain, name) = input.target.resolve()?;
        let attribute = ctx
            .store()
            .update_attribute(domain, name, input.description)
            .await?;

        let text = format!(
            "Successfully updated domain attribute:\nDomain: {domain}\n{}\nUpdated: {}",
            attribute_details(&attribute),
            args::timestamp(&attribute.updated_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&attribute)?))
    }
}

/// Deletes an attribute definition and all of its values
pub struct DeleteDomainAttribute;

#[async_trait]
impl McpTool for DeleteDomainAttribute {
    fn definition(&self) -> ToolDefinition {
        definition(
            "delete_domain_attribute",
            "Delete Domain Attribute",
            "Remove domain attribute definition (requires: attribute must exist via create_domain_attribute; removes all values from nodes)",
            attribute_name_schema(None),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: AttributeNameArgs = args::parse(arguments)?;
        let (domain, name) = input.resolve()?;
        let attribute = ctx.store().delete_attribute(domain, name).await?;

        Ok(CallToolResult::text(format!(
            "Successfully deleted domain attribute:\nDomain: {domain}\nName: {}\nType: {}",
            attribute.name, attribute.attribute_type
        )))
    }
}

// ============================================================================
// Queries across nodes and attributes
// ============================================================================

#[derive(Deserialize)]
struct FilterArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    filters: Vec<AttributeFilter>,
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    size: Option<i64>,
}

/// Lists nodes whose attribute values match every filter
pub struct FilterNodesByAttributes;

#[async_trait]
impl McpTool for FilterNodesByAttributes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "filter_nodes_by_attributes",
            "Filter Nodes By Attributes",
            "Filter nodes by attribute values (requires: domain must exist via create_domain; attributes defined via create_domain_attribute)",
            args::with_paging(json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to search"
                    },
                    "filters": {
                        "type": "array",
                        "description": "All filters must match",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "value": {"type": "string"},
                                "operator": {
                                    "type": "string",
                                    "enum": ["equals", "contains", "starts_with", "ends_with"],
                                    "default": "equals"
                                }
                            },
                            "required": ["name", "value"]
                        }
                    }
                },
                "required": ["domain_name", "filters"]
            })),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: FilterArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        if input.filters.is_empty() {
            return Err(ToolError::invalid_arguments(
                "missing required argument: filters",
            ));
        }
        let (page, size) = args::page_and_size(input.page, input.size);

        let result = ctx
            .store()
            .filter_nodes(domain, &input.filters, page, size)
            .await?;
        render_node_page(
            ctx,
            &result,
            format!("No nodes found matching the specified filters in domain '{domain}'"),
        )
    }
}

#[derive(Serialize)]
struct NodeWithAttributesView<'a> {
    #[serde(flatten)]
    node: NodeView<'a>,
    attributes: &'a [NodeAttribute],
}

/// Fetches a node together with all of its attribute values
pub struct GetNodeWithAttributes;

#[async_trait]
impl McpTool for GetNodeWithAttributes {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_node_with_attributes",
            "Get Node With Attributes",
            "Get URL details with all attributes (requires: node must exist via create_node; combines get_node + get_node_attributes)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": node_composite_schema()
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
        let values = ctx.store().get_node_attributes(node.id).await?;

        let mut text = format!(
            "Node: {}\nURL: {}\nDescription: {}\nDomain: {}\nCreated: {}\nUpdated: {}\n",
            node.title,
            node.url,
            node.description,
            node.domain_name,
            args::timestamp(&node.created_at),
            args::timestamp(&node.updated_at)
        );
        if values.is_empty() {
            text.push_str("\nNo attributes");
        } else {
            text.push_str("\nAttributes:\n");
            text.push_str(&values.iter().map(value_line).collect::<Vec<_>>().join("\n"));
        }

        let view = NodeWithAttributesView {
            node: NodeView::new(ctx, &node)?,
            attributes: &values,
        };
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use urldb::{MemoryStore, ServerConfig};

    use super::*;
    use crate::tools::domain::CreateDomain;
    use crate::tools::node::CreateNode;
    use crate::tools::ToolErrorKind;

    async fn seeded(auto_create: bool) -> (ToolContext, String) {
        let config = ServerConfig {
            auto_create_attributes: auto_create,
            ..ServerConfig::default()
        };
        let ctx = ToolContext::new(Arc::new(MemoryStore::new()), &config);
        CreateDomain
            .execute(&ctx, json!({"name": "docs", "description": "Docs"}))
            .await
            .expect("domain");
        let created = CreateNode
            .execute(&ctx, json!({"domain_name": "docs", "url": "https://docs.rs"}))
            .await
            .expect("node");
        let id = created.structured_content.expect("structured")["composite_id"]
            .as_str()
            .expect("id")
            .to_owned();
        (ctx, id)
    }

    #[tokio::test]
    async fn attribute_definition_lifecycle() {
        let (ctx, _) = seeded(true).await;
        CreateDomainAttribute
            .execute(
                &ctx,
                json!({"domain_name": "docs", "name": "lang", "type": "tag", "description": "Language"}),
            )
            .await
            .expect("create");

        let fetched = GetDomainAttribute
            .execute(&ctx, json!({"domain_name": "docs", "attribute_name": "lang"}))
            .await
            .expect("get");
        assert!(fetched.joined_text().contains("Type: tag"));

        UpdateDomainAttribute
            .execute(
                &ctx,
                json!({"domain_name": "docs", "attribute_name": "lang", "description": "Programming language"}),
            )
            .await
            .expect("update");

        let listed = ListDomainAttributes
            .execute(&ctx, json!({"domain_name": "docs"}))
            .await
            .expect("list");
        assert_eq!(
            listed.structured_content.expect("structured")["attributes"][0]["description"],
            "Programming language"
        );

        DeleteDomainAttribute
            .execute(&ctx, json!({"domain_name": "docs", "attribute_name": "lang"}))
            .await
            .expect("delete");
        let err = GetDomainAttribute
            .execute(&ctx, json!({"domain_name": "docs", "attribute_name": "lang"}))
            .await
            .expect_err("deleted");
        assert_eq!(err.kind, ToolErrorKind::Execution);
    }

    #[tokio::test]
    async fn unknown_attribute_type_rejected() {
        let (ctx, _) = seeded(true).await;
        let err = CreateDomainAttribute
            .execute(&ctx, json!({"domain_name": "docs", "name": "c", "type": "color"}))
            .await
            .expect_err("bad type");
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
        assert!(err.message.contains("ordered_tag"));
    }

    #[tokio::test]
    async fn set_values_uses_configured_auto_create_default() {
        let (ctx, id) = seeded(false).await;
        let err = SetNodeAttributes
            .execute(
                &ctx,
                json!({"composite_id": id, "attributes": [{"name": "topic", "value": "rust"}]}),
            )
            .await
            .expect_err("unknown attribute");
        assert!(err.message.contains("topic"));

        let result = SetNodeAttributes
            .execute(
                &ctx,
                json!({
                    "composite_id": id,
                    "attributes": [{"name": "topic", "value": "rust"}],
                    "auto_create_attributes": true
                }),
            )
            .await
            .expect("explicit auto create");
        assert!(result.joined_text().starts_with("Successfully set 1 attributes"));

        let values = GetNodeAttributes
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect("values");
        assert!(values.joined_text().contains("• topic (tag): rust"));
    }

    #[tokio::test]
    async fn filter_and_combined_view() {
        let (ctx, id) = seeded(true).await;
        SetNodeAttributes
            .execute(
                &ctx,
                json!({"composite_id": id, "attributes": [{"name": "topic", "value": "rust-lang"}]}),
            )
            .await
            .expect("set");

        let hits = FilterNodesByAttributes
            .execute(
                &ctx,
                json!({
                    "domain_name": "docs",
                    "filters": [{"name": "topic", "value": "rust", "operator": "starts_with"}]
                }),
            )
            .await
            .expect("filter");
        assert_eq!(hits.structured_content.expect("structured")["total_count"], 1);

        let misses = FilterNodesByAttributes
            .execute(
                &ctx,
                json!({"domain_name": "docs", "filters": [{"name": "topic", "value": "rust"}]}),
            )
            .await
            .expect("filter");
        assert!(misses.joined_text().starts_with("No nodes found matching"));

        let combined = GetNodeWithAttributes
            .execute(&ctx, json!({"composite_id": id}))
            .await
            .expect("combined");
        let structured = combined.structured_content.expect("structured");
        assert_eq!(structured["composite_id"], id);
        assert_eq!(structured["attributes"][0]["value"], "rust-lang");
    }

    #[tokio::test]
    async fn empty_attribute_list_rejected() {
        let (ctx, id) = seeded(true).await;
        let err = SetNodeAttributes
            .execute(&ctx, json!({"composite_id": id, "attributes": []}))
            .await
            .expect_err("empty");
        assert_eq!(err.message, "missing required argument: attributes");
    }
}
