// ABOUTME: Core types for the url-db library: error type, entities, and pagination
// ABOUTME: Defines domains, nodes, attributes, dependencies, templates, and their value enums
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Core Types
//!
//! Entity definitions shared by the store boundary, the validators, and the
//! MCP tool layer. Everything here is plain data; behaviour lives in
//! [`store`](crate::store) and friends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for url-db operations
#[derive(Debug, Clone)]
pub struct UrlDbError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced by the store and validators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity lookup failed
    NotFound,
    /// Uniqueness constraint violated
    AlreadyExists,
    /// Input failed a business rule
    Validation,
    /// Internal error (bug, unexpected state)
    Internal,
    /// Configuration error
    Config,
}

impl UrlDbError {
    /// Create a not-found error for the given entity description
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("{} not found", entity.into()),
        }
    }

    /// Create an already-exists error for the given entity description
    pub fn already_exists(entity: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AlreadyExists,
            message: format!("{} already exists", entity.into()),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }
}

impl fmt::Display for UrlDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UrlDbError {}

// ============================================================================
// Pagination
// ============================================================================

/// Default page size when the caller does not supply one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound for any caller-supplied page size
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of results with totals for navigation
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: usize,
    /// Requested page size
    pub size: usize,
    /// Number of items across all pages
    pub total_count: usize,
    /// Number of pages (at least 1)
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice an already filtered and ordered collection into one page
    pub fn paginate(all: Vec<T>, page: usize, size: usize) -> Self {
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let total_count = all.len();
        let total_pages = total_count.div_ceil(size).max(1);
        let offset = (page - 1).saturating_mul(size);
        let items = all.into_iter().skip(offset).take(size).collect();

        Self {
            items,
            page,
            size,
            total_count,
            total_pages,
        }
    }
}

// ============================================================================
// Domains and Nodes
// ============================================================================

/// A named collection of URLs
#[derive(Debug, Clone, Serialize)]
pub struct Domain {
    /// Internal identifier
    pub id: u64,
    /// Normalized, unique domain name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// A stored URL within a domain
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// Internal identifier
    pub id: u64,
    /// Owning domain identifier
    pub domain_id: u64,
    /// Owning domain name (denormalized for key construction)
    pub domain_name: String,
    /// The URL itself
    pub url: String,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a node
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    /// The URL to store
    pub url: String,
    /// Optional display title (defaults to the URL)
    pub title: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

/// Partial update for a node; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
}

impl NodeUpdate {
    /// Whether the update changes nothing
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Supported attribute value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Free tag
    Tag,
    /// Tag with a required ordering index
    OrderedTag,
    /// Numeric value
    Number,
    /// Short text
    String,
    /// Markdown text
    Markdown,
    /// Image URL or data URI
    Image,
}

/// All attribute types in catalog order
pub const ALL_ATTRIBUTE_TYPES: &[AttributeType] = &[
    AttributeType::Tag,
    AttributeType::OrderedTag,
    AttributeType::Number,
    AttributeType::String,
    AttributeType::Markdown,
    AttributeType::Image,
];

impl AttributeType {
    /// Wire name of the type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::OrderedTag => "ordered_tag",
            Self::Number => "number",
            Self::String => "string",
            Self::Markdown => "markdown",
            Self::Image => "image",
        }
    }

    /// Parse a wire name, returning `None` for unknown types
    pub fn parse(value: &str) -> Option<Self> {
        ALL_ATTRIBUTE_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == value)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute definition scoped to one domain
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    /// Internal identifier
    pub id: u64,
    /// Owning domain identifier
    pub domain_id: u64,
    /// Attribute name, unique within the domain
    pub name: String,
    /// Value type
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Free-form description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// An attribute value attached to a node
#[derive(Debug, Clone, Serialize)]
pub struct NodeAttribute {
    /// Internal identifier
    pub id: u64,
    /// Node the value belongs to
    pub node_id: u64,
    /// Attribute definition identifier
    pub attribute_id: u64,
    /// Attribute name (denormalized)
    pub name: String,
    /// Attribute type (denormalized)
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Raw value
    pub value: String,
    /// Ordering index for `ordered_tag` values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// One attribute value supplied by a caller
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeValueInput {
    /// Attribute name
    pub name: String,
    /// Raw value
    pub value: String,
    /// Ordering index (required for `ordered_tag`)
    #[serde(default)]
    pub order_index: Option<i64>,
}

/// A node together with all of its attribute values
#[derive(Debug, Clone, Serialize)]
pub struct NodeWithAttributes {
    /// The node
    pub node: Node,
    /// Attribute values in insertion order
    pub attributes: Vec<NodeAttribute>,
}

/// Comparison used by attribute filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match
    #[default]
    Equals,
    /// Substring match
    Contains,
    /// Prefix match
    StartsWith,
    /// Suffix match
    EndsWith,
}

impl FilterOperator {
    /// Apply the operator to a stored value
    pub fn matches(self, stored: &str, expected: &str) -> bool {
        match self {
            Self::Equals => stored == expected,
            Self::Contains => stored.contains(expected),
            Self::StartsWith => stored.starts_with(expected),
            Self::EndsWith => stored.ends_with(expected),
        }
    }
}

/// One attribute filter; all filters of a query must match
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeFilter {
    /// Attribute name
    pub name: String,
    /// Value to compare against
    pub value: String,
    /// Comparison operator
    #[serde(default)]
    pub operator: FilterOperator,
}

// ============================================================================
// Dependencies
// ============================================================================

/// Strength of a dependency edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The dependent cannot exist without the dependency
    Hard,
    /// Informational dependency
    Soft,
    /// Plain reference
    Reference,
}

impl DependencyType {
    /// Wire name of the type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed dependency: `dependent_node_id` depends on `dependency_node_id`
#[derive(Debug, Clone, Serialize)]
pub struct Dependency {
    /// Internal identifier
    pub id: u64,
    /// Node that depends on another
    pub dependent_node_id: u64,
    /// Node being depended upon
    pub dependency_node_id: u64,
    /// Edge strength
    pub dependency_type: DependencyType,
    /// Delete the dependent when the dependency is deleted
    pub cascade_delete: bool,
    /// Touch the dependent when the dependency is updated
    pub cascade_update: bool,
    /// Free-form description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a dependency
#[derive(Debug, Clone)]
pub struct NewDependency {
    /// Node that depends on another
    pub dependent_node_id: u64,
    /// Node being depended upon
    pub dependency_node_id: u64,
    /// Edge strength
    pub dependency_type: DependencyType,
    /// Cascade deletes along this edge
    pub cascade_delete: bool,
    /// Cascade updates along this edge
    pub cascade_update: bool,
    /// Free-form description
    pub description: String,
}

// ============================================================================
// Templates
// ============================================================================

/// Template categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Page layout
    Layout,
    /// Input form
    Form,
    /// Structured document
    Document,
    /// Anything else
    Custom,
}

/// All template types in catalog order
pub const ALL_TEMPLATE_TYPES: &[TemplateType] = &[
    TemplateType::Layout,
    TemplateType::Form,
    TemplateType::Document,
    TemplateType::Custom,
];

impl TemplateType {
    /// Wire name of the type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Form => "form",
            Self::Document => "document",
            Self::Custom => "custom",
        }
    }

    /// Parse a wire name, returning `None` for unknown types
    pub fn parse(value: &str) -> Option<Self> {
        ALL_TEMPLATE_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == value)
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable JSON template scoped to one domain
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    /// Internal identifier
    pub id: u64,
    /// Owning domain identifier
    pub domain_id: u64,
    /// Owning domain name (denormalized for key construction)
    pub domain_name: String,
    /// Template name, unique within the domain
    pub name: String,
    /// Category derived from the template data
    pub template_type: TemplateType,
    /// Version string derived from the template data
    pub version: String,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// The template document
    pub template_data: Value,
    /// Inactive templates are read-only
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template
#[derive(Debug, Clone)]
pub struct NewTemplate {
    /// Template name
    pub name: String,
    /// Template document (validated on create)
    pub template_data: Value,
    /// Optional display title
    pub title: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

/// Partial update for a template; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    /// Replacement template document
    pub template_data: Option<Value>,
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
}

/// Listing filter for templates
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    /// Only templates of this type
    pub template_type: Option<TemplateType>,
    /// Only active templates
    pub active_only: bool,
    /// Case-insensitive substring over name, title, and description
    pub search: Option<String>,
}
