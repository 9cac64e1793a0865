// ABOUTME: Store traits forming the boundary between MCP tools and the url-db business layer
// ABOUTME: Splits domain, node, attribute, dependency, and template operations into async traits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Store Boundary
//!
//! Tool handlers only ever see these traits. [`MemoryStore`](memory::MemoryStore)
//! is the bundled implementation; a SQL-backed store would implement the same
//! traits. Domain names passed in are display names and are normalized by the
//! implementation before lookup.

pub mod memory;

use async_trait::async_trait;

use crate::types::{
    Attribute, AttributeFilter, AttributeType, AttributeValueInput, Dependency, Domain,
    NewDependency, NewNode, NewTemplate, Node, NodeAttribute, NodeUpdate, Page, Template,
    TemplateFilter, TemplateUpdate, UrlDbError,
};

pub use memory::MemoryStore;

/// Domain lifecycle operations
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// List domains ordered by creation
    async fn list_domains(&self, page: usize, size: usize) -> Result<Page<Domain>, UrlDbError>;

    /// Create a domain; the name is normalized before storage
    async fn create_domain(&self, name: &str, description: &str) -> Result<Domain, UrlDbError>;

    /// Look up a domain by (normalized) name
    async fn get_domain(&self, name: &str) -> Result<Domain, UrlDbError>;
}

/// Node (URL) operations
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// List nodes of a domain, optionally filtered by a case-insensitive search term
    async fn list_nodes(
        &self,
        domain: &str,
        page: usize,
        size: usize,
        search: Option<&str>,
    ) -> Result<Page<Node>, UrlDbError>;

    /// Create a node; the URL must be unique within the domain
    async fn create_node(&self, domain: &str, node: NewNode) -> Result<Node, UrlDbError>;

    /// Fetch a node by id
    async fn get_node(&self, id: u64) -> Result<Node, UrlDbError>;

    /// Apply a partial update to a node
    async fn update_node(&self, id: u64, update: NodeUpdate) -> Result<Node, UrlDbError>;

    /// Delete a node, its attribute values, and its dependency edges
    ///
    /// Dependents linked with `cascade_delete` are deleted as well.
    async fn delete_node(&self, id: u64) -> Result<Node, UrlDbError>;

    /// Find a node by exact URL within a domain
    async fn find_node_by_url(&self, domain: &str, url: &str) -> Result<Node, UrlDbError>;

    /// List nodes whose attribute values satisfy every filter
    async fn filter_nodes(
        &self,
        domain: &str,
        filters: &[AttributeFilter],
        page: usize,
        size: usize,
    ) -> Result<Page<Node>, UrlDbError>;
}

/// Attribute definitions and node attribute values
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// List the attribute definitions of a domain
    async fn list_attributes(&self, domain: &str) -> Result<Vec<Attribute>, UrlDbError>;

    /// Define a new attribute in a domain
    async fn create_attribute(
        &self,
        domain: &str,
        name: &str,
        attribute_type: AttributeType,
        description: &str,
    ) -> Result<Attribute, UrlDbError>;

    /// Fetch one attribute definition
    async fn get_attribute(&self, domain: &str, name: &str) -> Result<Attribute, UrlDbError>;

    /// Update an attribute's description
    async fn update_attribute(
        &self,
        domain: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Attribute, UrlDbError>;

    /// Delete an attribute definition and every value using it
    async fn delete_attribute(&self, domain: &str, name: &str) -> Result<Attribute, UrlDbError>;

    /// All attribute values of a node
    async fn get_node_attributes(&self, node_id: u64) -> Result<Vec<NodeAttribute>, UrlDbError>;

    /// Replace the values of the named attributes on a node
    ///
    /// Validation happens before any write. Unknown attribute names are
    /// created as `tag` attributes when `auto_create` is set.
    async fn set_node_attributes(
        &self,
        node_id: u64,
        values: Vec<AttributeValueInput>,
        auto_create: bool,
    ) -> Result<Vec<NodeAttribute>, UrlDbError>;
}

/// Dependency edges between nodes
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Create an edge; rejects self references, duplicates, and cycles
    async fn create_dependency(&self, dependency: NewDependency)
        -> Result<Dependency, UrlDbError>;

    /// Edges where the node is the dependent
    async fn list_dependencies(&self, node_id: u64) -> Result<Vec<Dependency>, UrlDbError>;

    /// Edges where the node is depended upon
    async fn list_dependents(&self, node_id: u64) -> Result<Vec<Dependency>, UrlDbError>;

    /// Delete one edge by id
    async fn delete_dependency(&self, id: u64) -> Result<Dependency, UrlDbError>;
}

/// Template documents
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// List templates of a domain
    async fn list_templates(
        &self,
        domain: &str,
        filter: TemplateFilter,
        page: usize,
        size: usize,
    ) -> Result<Page<Template>, UrlDbError>;

    /// Create a template after validating its document
    async fn create_template(&self, domain: &str, template: NewTemplate)
        -> Result<Template, UrlDbError>;

    /// Fetch a template by id
    async fn get_template(&self, id: u64) -> Result<Template, UrlDbError>;

    /// Apply a partial update; inactive templates only accept reactivation
    async fn update_template(&self, id: u64, update: TemplateUpdate)
        -> Result<Template, UrlDbError>;

    /// Delete a template
    async fn delete_template(&self, id: u64) -> Result<Template, UrlDbError>;

    /// Copy a template under a new name in the same domain
    async fn clone_template(
        &self,
        id: u64,
        new_name: &str,
        new_title: Option<String>,
        new_description: Option<String>,
    ) -> Result<Template, UrlDbError>;
}

/// Everything the MCP tool layer needs from the business layer
pub trait UrlStore:
    DomainStore + NodeStore + AttributeStore + DependencyStore + TemplateStore
{
}

impl<T> UrlStore for T where
    T: DomainStore + NodeStore + AttributeStore + DependencyStore + TemplateStore
{
}
