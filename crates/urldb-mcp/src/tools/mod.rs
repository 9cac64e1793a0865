// ABOUTME: Tool registry that maps MCP tool names to handler implementations
// ABOUTME: Provides the McpTool trait, ToolError, and the ordered url-db tool catalog
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod args;
pub mod attribute;
pub mod dependency;
pub mod domain;
pub mod node;
pub mod scan;
pub mod server_info;
pub mod template;

use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use urldb::UrlDbError;

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ToolContext;

// ============================================================================
// Errors
// ============================================================================

/// Error raised while resolving or running a tool
#[derive(Debug, Clone)]
pub struct ToolError {
    /// Error category
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of tool failures, mapped to JSON-RPC codes by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// No tool registered under the requested name
    UnknownTool,
    /// A tool with the same name is already registered
    Duplicate,
    /// Arguments missing, mistyped, or failing a rule
    InvalidArguments,
    /// The store rejected or failed the operation
    Execution,
}

impl ToolError {
    /// No tool with the given name
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            kind: ToolErrorKind::UnknownTool,
            message: format!("Tool not found: {name}"),
        }
    }

    /// Argument problem detected before any side effect
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidArguments,
            message: message.into(),
        }
    }

    /// Downstream failure
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Execution,
            message: message.into(),
        }
    }

    fn duplicate(name: &str) -> Self {
        Self {
            kind: ToolErrorKind::Duplicate,
            message: format!("tool '{name}' is already registered"),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<UrlDbError> for ToolError {
    fn from(err: UrlDbError) -> Self {
        Self::execution(err.message)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Trait implemented by each MCP tool exposed by this server
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Return the tool's MCP definition (name, title, description, input schema)
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments against the store
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError>;
}

/// Ordered registry mapping tool names to their handler implementations
///
/// The same map feeds `tools/list` and `tools/call`, so every listed
/// name has exactly one handler.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Box<dyn McpTool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler, keyed by its definition name
    pub fn register(&mut self, tool: Box<dyn McpTool>) -> Result<(), ToolError> {
        let name = tool.definition().name;
        if self.tools.contains_key(&name) {
            return Err(ToolError::duplicate(&name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Registered names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// List all registered tool definitions for `tools/list` responses
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Dispatch a `tools/call` to the named tool handler
    pub async fn execute(
        &self,
        name: &str,
        ctx: &ToolContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        match self.get(name) {
            Some(tool) => tool.execute(ctx, arguments).await,
            None => Err(ToolError::unknown_tool(name)),
        }
    }
}

/// Build the default tool registry with the full url-db catalog
pub fn build_tool_registry() -> Result<ToolRegistry, ToolError> {
    let catalog: Vec<Box<dyn McpTool>> = vec![
        Box::new(server_info::GetServerInfo),
        Box::new(domain::ListDomains),
        Box::new(domain::CreateDomain),
        Box::new(node::ListNodes),
        Box::new(node::CreateNode),
        Box::new(node::GetNode),
        Box::new(node::UpdateNode),
        Box::new(node::DeleteNode),
        Box::new(node::FindNodeByUrl),
        Box::new(scan::ScanAllContent),
        Box::new(attribute::GetNodeAttributes),
        Box::new(attribute::SetNodeAttributes),
        Box::new(attribute::ListDomainAttributes),
        Box::new(attribute::CreateDomainAttribute),
        Box::new(attribute::GetDomainAttribute),
        Box::new(attribute::UpdateDomainAttribute),
        Box::new(attribute::DeleteDomainAttribute),
        Box::new(dependency::CreateDependency),
        Box::new(dependency::ListNodeDependencies),
        Box::new(dependency::ListNodeDependents),
        Box::new(dependency::DeleteDependency),
        Box::new(attribute::FilterNodesByAttributes),
        Box::new(attribute::GetNodeWithAttributes),
        Box::new(template::ListTemplates),
        Box::new(template::CreateTemplate),
        Box::new(template::GetTemplate),
        Box::new(template::UpdateTemplate),
        Box::new(template::DeleteTemplate),
        Box::new(template::CloneTemplate),
        Box::new(template::GenerateTemplateScaffold),
        Box::new(template::ValidateTemplate),
    ];

    let mut registry = ToolRegistry::new();
    for tool in catalog {
        registry.register(tool)?;
    }
    Ok(registry)
}

/// Shorthand for building a [`ToolDefinition`]
pub(crate) fn definition(
    name: &str,
    title: &str,
    description: &str,
    input_schema: Value,
) -> ToolDefinition {
    ToolDefinition {
        name: name.to_owned(),
        title: title.to_owned(),
        description: description.to_owned(),
        input_schema,
    }
}
