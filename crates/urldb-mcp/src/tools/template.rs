// ABOUTME: MCP tools for domain-scoped JSON templates
// ABOUTME: CRUD, cloning, scaffold generation, and validation of template documents
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use urldb::template::{
    decode_template_data, scaffold, template_header, valid_template_type_names, validate_template,
    TemplateValidation,
};
use urldb::types::{NewTemplate, Template, TemplateFilter, TemplateType, TemplateUpdate};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;
use crate::tools::args::{self, lenient_int};
use crate::tools::{definition, McpTool, ToolError};

/// A template as returned to clients, carrying its composite id
#[derive(Serialize)]
struct TemplateView<'a> {
    composite_id: String,
    #[serde(flatten)]
    template: &'a Template,
}

impl<'a> TemplateView<'a> {
    fn new(ctx: &ToolContext, template: &'a Template) -> Result<Self, ToolError> {
        Ok(Self {
            composite_id: ctx.template_key(template)?,
            template,
        })
    }
}

const fn status(template: &Template) -> &'static str {
    if template.is_active {
        "active"
    } else {
        "inactive"
    }
}

fn parse_template_type(raw: &str) -> Result<TemplateType, ToolError> {
    TemplateType::parse(raw.trim()).ok_or_else(|| {
        ToolError::invalid_arguments(format!(
            "invalid template type '{raw}'. Valid: {}",
            valid_template_type_names()
        ))
    })
}

/// Decode `template_data` given as an object or as JSON text
fn decode_data(raw: &Value) -> Result<Value, ToolError> {
    if raw.is_null() {
        return Err(ToolError::invalid_arguments(
            "missing required argument: template_data",
        ));
    }
    decode_template_data(raw)
        .map_err(|issue| ToolError::invalid_arguments(format!("invalid template_data: {}", issue.message)))
}

fn template_key_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
        "pattern": "^[a-zA-Z0-9_-]+:[a-zA-Z0-9_-]+:template:[0-9]+$"
    })
}

fn template_data_schema() -> Value {
    json!({
        "type": ["object", "string"],
        "description": "Template document (object or JSON text) with at least 'version' and 'type'"
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[derive(Deserialize)]
struct ListTemplatesArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    template_type: Option<String>,
    #[serde(default)]
    active_only: bool,
    #[serde(default)]
    search: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    size: Option<i64>,
}

/// Lists templates of a domain
pub struct ListTemplates;

#[async_trait]
impl McpTool for ListTemplates {
    fn definition(&self) -> ToolDefinition {
        definition(
            "list_templates",
            "List Templates",
            "List templates in domain (requires: domain must exist via create_domain)",
            args::with_paging(json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain whose templates to list"
                    },
                    "template_type": {
                        "type": "string",
                        "enum": ["layout", "form", "document", "custom"]
                    },
                    "active_only": {
                        "type": "boolean",
                        "description": "Only list active templates (default false)"
                    },
                    "search": {
                        "type": "string",
                        "description": "Case-insensitive filter over name, title, and description"
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
        let input: ListTemplatesArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let template_type = input
            .template_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(parse_template_type)
            .transpose()?;
        let (page, size) = args::page_and_size(input.page, input.size);

        let filter = TemplateFilter {
            template_type,
            active_only: input.active_only,
            search: input.search,
        };
        let result = ctx
            .store()
            .list_templates(domain, filter, page, size)
            .await?;

        let views = result
            .items
            .iter()
            .map(|t| TemplateView::new(ctx, t))
            .collect::<Result<Vec<_>, _>>()?;

        let text = if views.is_empty() {
            format!("No templates found in domain '{domain}'")
        } else {
            let lines: Vec<String> = views
                .iter()
                .enumerate()
                .map(|(i, view)| {
                    let t = view.template;
                    let mut entry = format!(
                        "{}. {} ({})\n   Type: {} | Version: {} | Status: {}",
                        i + 1,
                        t.name,
                        view.composite_id,
                        t.template_type,
                        t.version,
                        status(t)
                    );
                    if !t.title.is_empty() {
                        entry.push_str(&format!("\n   Title: {}", t.title));
                    }
                    if !t.description.is_empty() {
                        entry.push_str(&format!("\n   Description: {}", t.description));
                    }
                    entry.push_str(&format!("\n   Updated: {}", args::timestamp(&t.updated_at)));
                    entry
                })
                .collect();
            format!(
                "Found {} templates (page {}, total: {}):\n\n{}",
                views.len(),
                result.page,
                result.total_count,
                lines.join("\n\n")
            )
        };

        Ok(CallToolResult::text(text).with_structured(json!({
            "templates": views,
            "page": result.page,
            "size": result.size,
            "total_count": result.total_count,
            "total_pages": result.total_pages,
        })))
    }
}

#[derive(Deserialize)]
struct CreateTemplateArgs {
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    template_data: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Creates a template after validating its document
pub struct CreateTemplate;

#[async_trait]
impl McpTool for CreateTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "create_template",
            "Create Template",
            "Create new template in domain (requires: domain must exist via create_domain; use validate_template to check template_data)",
            json!({
                "type": "object",
                "properties": {
                    "domain_name": {
                        "type": "string",
                        "description": "Domain to create the template in"
                    },
                    "name": {
                        "type": "string",
                        "description": "Template name (letters, digits, '_' and '-')"
                    },
                    "template_data": template_data_schema(),
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["domain_name", "name", "template_data"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CreateTemplateArgs = args::parse(arguments)?;
        let domain = args::required(&input.domain_name, "domain_name")?;
        let name = args::required(&input.name, "name")?;
        let template_data = decode_data(&input.template_data)?;

        let template = ctx
            .store()
            .create_template(
                domain,
                NewTemplate {
                    name: name.to_owned(),
                    template_data,
                    title: input.title,
                    description: input.description,
                },
            )
            .await?;
        let view = TemplateView::new(ctx, &template)?;

        let text = format!(
            "Template created successfully!\n\nComposite ID: {}\nName: {}\nType: {}\nVersion: {}\nTitle: {}\nDescription: {}\nStatus: {}\nCreated: {}",
            view.composite_id,
            template.name,
            template.template_type,
            template.version,
            template.title,
            template.description,
            status(&template),
            args::timestamp(&template.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct CompositeIdArgs {
    #[serde(default)]
    composite_id: String,
}

/// Fetches one template
pub struct GetTemplate;

#[async_trait]
impl McpTool for GetTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "get_template",
            "Get Template",
            "Get template details (requires: template must exist via create_template; use composite_id from create_template)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": template_key_schema("Template composite id (tool:domain:template:id)")
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
        let template = ctx
            .resolve_template(&input.composite_id, "composite_id")
            .await?;
        let view = TemplateView::new(ctx, &template)?;

        let text = format!(
            "Template Details:\n\nComposite ID: {}\nName: {}\nType: {}\nVersion: {}\nTitle: {}\nDescription: {}\nStatus: {}\nCreated: {}\nUpdated: {}\n\nTemplate Data:\n{}",
            view.composite_id,
            template.name,
            template.template_type,
            template.version,
            template.title,
            template.description,
            status(&template),
            args::timestamp(&template.created_at),
            args::timestamp(&template.updated_at),
            pretty(&template.template_data)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct UpdateTemplateArgs {
    #[serde(default)]
    composite_id: String,
    #[serde(default)]
    template_data: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

/// Applies a partial update to a template
pub struct UpdateTemplate;

#[async_trait]
impl McpTool for UpdateTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "update_template",
            "Update Template",
            "Update template (requires: template must exist via create_template; use validate_template to check new template_data; inactive templates only accept is_active=true)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": template_key_schema("Template composite id (tool:domain:template:id)"),
                    "template_data": template_data_schema(),
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "is_active": {"type": "boolean"}
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
        let input: UpdateTemplateArgs = args::parse(arguments)?;
        let template_data = if input.template_data.is_null() {
            None
        } else {
            Some(decode_data(&input.template_data)?)
        };
        let update = TemplateUpdate {
            template_data,
            title: input.title,
            description: input.description,
            is_active: input.is_active,
        };

        let template = ctx
            .resolve_template(&input.composite_id, "composite_id")
            .await?;
        let template = ctx.store().update_template(template.id, update).await?;
        let view = TemplateView::new(ctx, &template)?;

        let text = format!(
            "Template updated successfully!\n\nComposite ID: {}\nName: {}\nType: {}\nVersion: {}\nTitle: {}\nDescription: {}\nStatus: {}\nUpdated: {}",
            view.composite_id,
            template.name,
            template.template_type,
            template.version,
            template.title,
            template.description,
            status(&template),
            args::timestamp(&template.updated_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

/// Deletes a template
pub struct DeleteTemplate;

#[async_trait]
impl McpTool for DeleteTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "delete_template",
            "Delete Template",
            "Delete template (requires: template must exist via create_template)",
            json!({
                "type": "object",
                "properties": {
                    "composite_id": template_key_schema("Template composite id (tool:domain:template:id)")
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
        let template = ctx
            .resolve_template(&input.composite_id, "composite_id")
            .await?;
        let composite_id = ctx.template_key(&template)?;
        let deleted = ctx.store().delete_template(template.id).await?;

        Ok(CallToolResult::text(format!(
            "Template deleted successfully!\n\nComposite ID: {composite_id}\nName: {}\nDeleted at: {}",
            deleted.name,
            args::timestamp(&chrono::Utc::now())
        )))
    }
}

#[derive(Deserialize)]
struct CloneTemplateArgs {
    #[serde(default)]
    source_composite_id: String,
    #[serde(default)]
    new_name: String,
    #[serde(default)]
    new_title: Option<String>,
    #[serde(default)]
    new_description: Option<String>,
}

/// Copies a template under a new name in the same domain
pub struct CloneTemplate;

#[async_trait]
impl McpTool for CloneTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "clone_template",
            "Clone Template",
            "Clone existing template (requires: source template must exist via create_template; creates new template with same domain)",
            json!({
                "type": "object",
                "properties": {
                    "source_composite_id": template_key_schema("Composite id of the template to copy"),
                    "new_name": {
                        "type": "string",
                        "description": "Name of the copy (unique within the domain)"
                    },
                    "new_title": {"type": "string"},
                    "new_description": {"type": "string"}
                },
                "required": ["source_composite_id", "new_name"]
            }),
        )
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: CloneTemplateArgs = args::parse(arguments)?;
        let new_name = args::required(&input.new_name, "new_name")?;
        let source = ctx
            .resolve_template(&input.source_composite_id, "source_composite_id")
            .await?;
        let source_id = ctx.template_key(&source)?;

        let cloned = ctx
            .store()
            .clone_template(source.id, new_name, input.new_title, input.new_description)
            .await?;
        let view = TemplateView::new(ctx, &cloned)?;

        let text = format!(
            "Template cloned successfully!\n\nSource: {source_id}\nNew Composite ID: {}\nNew Name: {}\nType: {}\nVersion: {}\nTitle: {}\nDescription: {}\nCreated: {}",
            view.composite_id,
            cloned.name,
            cloned.template_type,
            cloned.version,
            cloned.title,
            cloned.description,
            args::timestamp(&cloned.created_at)
        );
        Ok(CallToolResult::text(text).with_structured(args::structured(&view)?))
    }
}

#[derive(Deserialize)]
struct ScaffoldArgs {
    #[serde(default)]
    template_type: String,
}

/// Produces a starter document for a template type
pub struct GenerateTemplateScaffold;

#[async_trait]
impl McpTool for GenerateTemplateScaffold {
    fn definition(&self) -> ToolDefinition {
        definition(
            "generate_template_scaffold",
            "Generate Template Scaffold",
            "Generate template scaffold for given type (helper: provides starting point for create_template)",
            json!({
                "type": "object",
                "properties": {
                    "template_type": {
                        "type": "string",
                        "enum": ["layout", "form", "document", "custom"]
                    }
                },
                "required": ["template_type"]
            }),
        )
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: ScaffoldArgs = args::parse(arguments)?;
        let raw = args::required(&input.template_type, "template_type")?;
        let template_type = parse_template_type(raw)?;
        let document = scaffold(template_type);

        let text = format!(
            "Template scaffold for type '{template_type}':\n\n{}\n\nYou can use this as a starting point for creating a new template. Copy the JSON data and use it with the create_template tool.",
            pretty(&document)
        );
        Ok(CallToolResult::text(text).with_structured(document))
    }
}

#[derive(Deserialize)]
struct ValidateArgs {
    #[serde(default)]
    template_data: Value,
}

/// Checks a template document without storing it
///
/// Invalid documents are reported as an `isError` result rather than a
/// protocol error so the agent can read the individual issues.
pub struct ValidateTemplate;

#[async_trait]
impl McpTool for ValidateTemplate {
    fn definition(&self) -> ToolDefinition {
        definition(
            "validate_template",
            "Validate Template",
            "Validate template data structure (helper: use before create_template or update_template)",
            json!({
                "type": "object",
                "properties": {
                    "template_data": template_data_schema()
                },
                "required": ["template_data"]
            }),
        )
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let input: ValidateArgs = args::parse(arguments)?;
        if input.template_data.is_null() {
            return Err(ToolError::invalid_arguments(
                "missing required argument: template_data",
            ));
        }

        let validation = match decode_template_data(&input.template_data) {
            Ok(data) => {
                let validation = validate_template(&data);
                if let (true, Some((kind, version))) = (validation.valid, template_header(&data)) {
                    let text = format!(
                        "Template validation successful!\n\nType: {kind}\nVersion: {version}\n\nThe template data is valid and can be used to create a new template."
                    );
                    return Ok(CallToolResult::text(text).with_structured(args::structured(&validation)?));
                }
                validation
            }
            Err(issue) => TemplateValidation {
                valid: false,
                errors: vec![issue],
            },
        };

        let mut text = String::from("Template validation failed:\n");
        for (i, issue) in validation.errors.iter().enumerate() {
            text.push_str(&format!("\n{}. Path: {} - {}", i + 1, issue.path, issue.message));
            if let Some(value) = &issue.value {
                text.push_str(&format!(" (value: {value})"));
            }
        }
        Ok(CallToolResult::error(text).with_structured(args::structured(&validation)?))
    }
}
