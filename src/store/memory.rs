// ABOUTME: In-memory UrlStore implementation guarded by a tokio RwLock
// ABOUTME: Enforces uniqueness, value validation, dependency rules, cascades, and template rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::composite_key::{is_valid_name_segment, normalize};
use crate::store::{AttributeStore, DependencyStore, DomainStore, NodeStore, TemplateStore};
use crate::template::{template_header, validate_template};
use crate::types::{
    Attribute, AttributeFilter, AttributeType, AttributeValueInput, Dependency, Domain,
    NewDependency, NewNode, NewTemplate, Node, NodeAttribute, NodeUpdate, Page, Template,
    TemplateFilter, TemplateType, TemplateUpdate, UrlDbError,
};
use crate::validation::validate_attribute_value;

const MAX_TEMPLATE_NAME_LENGTH: usize = 100;

/// Thread-safe in-memory store
///
/// All tables live behind one lock so multi-table operations (cascading
/// deletes, attribute replacement) are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct Sequences {
    domain: u64,
    node: u64,
    attribute: u64,
    node_attribute: u64,
    dependency: u64,
    template: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    domains: BTreeMap<u64, Domain>,
    nodes: BTreeMap<u64, Node>,
    attributes: BTreeMap<u64, Attribute>,
    node_attributes: BTreeMap<u64, NodeAttribute>,
    dependencies: BTreeMap<u64, Dependency>,
    templates: BTreeMap<u64, Template>,
}

impl Tables {
    fn domain(&self, name: &str) -> Result<&Domain, UrlDbError> {
        let normalized = normalize(name);
        self.domains
            .values()
            .find(|d| d.name == normalized)
            .ok_or_else(|| UrlDbError::not_found(format!("domain '{name}'")))
    }

    fn node(&self, id: u64) -> Result<&Node, UrlDbError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("node {id}")))
    }

    fn attribute(&self, domain_id: u64, name: &str) -> Option<&Attribute> {
        self.attributes
            .values()
            .find(|a| a.domain_id == domain_id && a.name == name)
    }

    fn template(&self, id: u64) -> Result<&Template, UrlDbError> {
        self.templates
            .get(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("template {id}")))
    }

    fn domain_nodes(&self, domain_id: u64) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.domain_id == domain_id)
    }

    fn values_of(&self, node_id: u64) -> impl Iterator<Item = &NodeAttribute> {
        self.node_attributes
            .values()
            .filter(move |v| v.node_id == node_id)
    }

    fn template_name_taken(&self, domain_id: u64, name: &str) -> bool {
        self.templates
            .values()
            .any(|t| t.domain_id == domain_id && t.name == name)
    }

    /// Whether `from` reaches `target` by following dependency edges
    fn depends_transitively(&self, from: u64, target: u64) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.dependencies
                    .values()
                    .filter(|d| d.dependent_node_id == current)
                    .map(|d| d.dependency_node_id),
            );
        }
        false
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn validate_template_name(name: &str) -> Result<(), UrlDbError> {
    if name.is_empty() || name.len() > MAX_TEMPLATE_NAME_LENGTH {
        return Err(UrlDbError::validation(format!(
            "template name must be 1 to {MAX_TEMPLATE_NAME_LENGTH} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UrlDbError::validation(format!(
            "template name '{name}' may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

fn checked_template_header(data: &Value) -> Result<(TemplateType, String), UrlDbError> {
    let validation = validate_template(data);
    if !validation.valid {
        let details: Vec<String> = validation
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        return Err(UrlDbError::validation(format!(
            "template data is invalid: {}",
            details.join("; ")
        )));
    }
    template_header(data)
        .ok_or_else(|| UrlDbError::internal("validated template is missing its header"))
}

// ============================================================================
// Domains
// ============================================================================

#[async_trait]
impl DomainStore for MemoryStore {
    async fn list_domains(&self, page: usize, size: usize) -> Result<Page<Domain>, UrlDbError> {
        let tables = self.tables.read().await;
        let all = tables.domains.values().cloned().collect();
        Ok(Page::paginate(all, page, size))
    }

    async fn create_domain(&self, name: &str, description: &str) -> Result<Domain, UrlDbError> {
        let normalized = normalize(name);
        if !is_valid_name_segment(&normalized) {
            return Err(UrlDbError::validation(format!(
                "domain name '{name}' does not normalize to a valid name"
            )));
        }

        let mut tables = self.tables.write().await;
        if tables.domains.values().any(|d| d.name == normalized) {
            return Err(UrlDbError::already_exists(format!("domain '{normalized}'")));
        }

        let now = Utc::now();
        let domain = Domain {
            id: next(&mut tables.seq.domain),
            name: normalized,
            description: description.to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.domains.insert(domain.id, domain.clone());
        debug!(domain = %domain.name, id = domain.id, "Created domain");
        Ok(domain)
    }

    async fn get_domain(&self, name: &str) -> Result<Domain, UrlDbError> {
        self.tables.read().await.domain(name).cloned()
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[async_trait]
impl NodeStore for MemoryStore {
    async fn list_nodes(
        &self,
        domain: &str,
        page: usize,
        size: usize,
        search: Option<&str>,
    ) -> Result<Page<Node>, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;
        let needle = search.map(str::to_lowercase).filter(|s| !s.is_empty());

        let all = tables
            .domain_nodes(domain_id)
            .filter(|n| {
                needle.as_deref().is_none_or(|needle| {
                    contains_ci(&n.url, needle)
                        || contains_ci(&n.title, needle)
                        || contains_ci(&n.description, needle)
                })
            })
            .cloned()
            .collect();
        Ok(Page::paginate(all, page, size))
    }

    async fn create_node(&self, domain: &str, node: NewNode) -> Result<Node, UrlDbError> {
        if node.url.trim().is_empty() {
            return Err(UrlDbError::validation("url cannot be empty"));
        }

        let mut tables = self.tables.write().await;
        let owner = tables.domain(domain)?.clone();
        if tables.domain_nodes(owner.id).any(|n| n.url == node.url) {
            return Err(UrlDbError::already_exists(format!(
                "url '{}' in domain '{}'",
                node.url, owner.name
            )));
        }

        let now = Utc::now();
        let created = Node {
            id: next(&mut tables.seq.node),
            domain_id: owner.id,
            domain_name: owner.name,
            url: node.url,
            title: node.title.unwrap_or_default(),
            description: node.description.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        tables.nodes.insert(created.id, created.clone());
        debug!(node = created.id, domain = %created.domain_name, "Created node");
        Ok(created)
    }

    async fn get_node(&self, id: u64) -> Result<Node, UrlDbError> {
        self.tables.read().await.node(id).cloned()
    }

    async fn update_node(&self, id: u64, update: NodeUpdate) -> Result<Node, UrlDbError> {
        if update.is_empty() {
            return Err(UrlDbError::validation(
                "at least one of title or description must be provided",
            ));
        }

        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let node = tables
            .nodes
            .get_mut(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("node {id}")))?;
        if let Some(title) = update.title {
            node.title = title;
        }
        if let Some(description) = update.description {
            node.description = description;
        }
        node.updated_at = now;
        let updated = node.clone();

        let touched: Vec<u64> = tables
            .dependencies
            .values()
            .filter(|d| d.dependency_node_id == id && d.cascade_update)
            .map(|d| d.dependent_node_id)
            .collect();
        for dependent in touched {
            if let Some(n) = tables.nodes.get_mut(&dependent) {
                n.updated_at = now;
            }
        }

        Ok(updated)
    }

    async fn delete_node(&self, id: u64) -> Result<Node, UrlDbError> {
        let mut tables = self.tables.write().await;
        let deleted = tables.node(id)?.clone();

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if tables.nodes.remove(&current).is_none() {
                continue;
            }
            pending.extend(
                tables
                    .dependencies
                    .values()
                    .filter(|d| d.dependency_node_id == current && d.cascade_delete)
                    .map(|d| d.dependent_node_id),
            );
            tables.node_attributes.retain(|_, v| v.node_id != current);
            tables.dependencies.retain(|_, d| {
                d.dependent_node_id != current && d.dependency_node_id != current
            });
            if current != id {
                debug!(node = current, cause = id, "Cascade deleted node");
            }
        }

        Ok(deleted)
    }

    async fn find_node_by_url(&self, domain: &str, url: &str) -> Result<Node, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;
        let found = tables
            .domain_nodes(domain_id)
            .find(|n| n.url == url)
            .cloned()
            .ok_or_else(|| UrlDbError::not_found(format!("node with url '{url}'")));
        found
    }

    async fn filter_nodes(
        &self,
        domain: &str,
        filters: &[AttributeFilter],
        page: usize,
        size: usize,
    ) -> Result<Page<Node>, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;

        let all = tables
            .domain_nodes(domain_id)
            .filter(|node| {
                filters.iter().all(|filter| {
                    tables.values_of(node.id).any(|v| {
                        v.name == filter.name && filter.operator.matches(&v.value, &filter.value)
                    })
                })
            })
            .cloned()
            .collect();
        Ok(Page::paginate(all, page, size))
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn list_attributes(&self, domain: &str) -> Result<Vec<Attribute>, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;
        Ok(tables
            .attributes
            .values()
            .filter(|a| a.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn create_attribute(
        &self,
        domain: &str,
        name: &str,
        attribute_type: AttributeType,
        description: &str,
    ) -> Result<Attribute, UrlDbError> {
        if name.trim().is_empty() {
            return Err(UrlDbError::validation("attribute name cannot be empty"));
        }

        let mut tables = self.tables.write().await;
        let domain_id = tables.domain(domain)?.id;
        if tables.attribute(domain_id, name).is_some() {
            return Err(UrlDbError::already_exists(format!("attribute '{name}'")));
        }

        let now = Utc::now();
        let attribute = Attribute {
            id: next(&mut tables.seq.attribute),
            domain_id,
            name: name.to_owned(),
            attribute_type,
            description: description.to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.attributes.insert(attribute.id, attribute.clone());
        Ok(attribute)
    }

    async fn get_attribute(&self, domain: &str, name: &str) -> Result<Attribute, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;
        tables
            .attribute(domain_id, name)
            .cloned()
            .ok_or_else(|| UrlDbError::not_found(format!("attribute '{name}'")))
    }

    async fn update_attribute(
        &self,
        domain: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Attribute, UrlDbError> {
        let mut tables = self.tables.write().await;
        let domain_id = tables.domain(domain)?.id;
        let attribute = tables
            .attributes
            .values_mut()
            .find(|a| a.domain_id == domain_id && a.name == name)
            .ok_or_else(|| UrlDbError::not_found(format!("attribute '{name}'")))?;

        if let Some(description) = description {
            attribute.description = description;
        }
        attribute.updated_at = Utc::now();
        Ok(attribute.clone())
    }

    async fn delete_attribute(&self, domain: &str, name: &str) -> Result<Attribute, UrlDbError> {
        let mut tables = self.tables.write().await;
        let domain_id = tables.domain(domain)?.id;
        let id = tables
            .attribute(domain_id, name)
            .map(|a| a.id)
            .ok_or_else(|| UrlDbError::not_found(format!("attribute '{name}'")))?;

        tables.node_attributes.retain(|_, v| v.attribute_id != id);
        tables
            .attributes
            .remove(&id)
            .ok_or_else(|| UrlDbError::internal("attribute vanished during delete"))
    }

    async fn get_node_attributes(&self, node_id: u64) -> Result<Vec<NodeAttribute>, UrlDbError> {
        let tables = self.tables.read().await;
        tables.node(node_id)?;
        let values = tables.values_of(node_id).cloned().collect();
        Ok(values)
    }

    async fn set_node_attributes(
        &self,
        node_id: u64,
        values: Vec<AttributeValueInput>,
        auto_create: bool,
    ) -> Result<Vec<NodeAttribute>, UrlDbError> {
        let mut tables = self.tables.write().await;
        let domain_id = tables.node(node_id)?.domain_id;

        // Resolve and validate everything before the first write
        let mut resolved = Vec::with_capacity(values.len());
        for input in values {
            if input.name.trim().is_empty() {
                return Err(UrlDbError::validation("attribute name cannot be empty"));
            }
            let existing = tables.attribute(domain_id, &input.name).map(|a| (a.id, a.attribute_type));
            let attribute_type = match existing {
                Some((_, t)) => t,
                None if auto_create => AttributeType::Tag,
                None => {
                    return Err(UrlDbError::not_found(format!(
                        "attribute '{}' (enable auto_create_attributes to create it)",
                        input.name
                    )))
                }
            };
            validate_attribute_value(attribute_type, &input.value, input.order_index).map_err(
                |e| UrlDbError::validation(format!("attribute '{}': {}", input.name, e.message)),
            )?;
            resolved.push((existing.map(|(id, _)| id), attribute_type, input));
        }

        let now = Utc::now();
        let mut replaced = HashSet::new();
        for (existing_id, attribute_type, input) in resolved {
            // Earlier entries of this call may have auto-created the attribute
            let known =
                existing_id.or_else(|| tables.attribute(domain_id, &input.name).map(|a| a.id));
            let attribute_id = match known {
                Some(id) => id,
                None => {
                    let id = next(&mut tables.seq.attribute);
                    debug!(attribute = %input.name, "Auto-created tag attribute");
                    tables.attributes.insert(
                        id,
                        Attribute {
                            id,
                            domain_id,
                            name: input.name.clone(),
                            attribute_type,
                            description: String::new(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    id
                }
            };

            if replaced.insert(attribute_id) {
                tables
                    .node_attributes
                    .retain(|_, v| !(v.node_id == node_id && v.attribute_id == attribute_id));
            }

            let id = next(&mut tables.seq.node_attribute);
            tables.node_attributes.insert(
                id,
                NodeAttribute {
                    id,
                    node_id,
                    attribute_id,
                    name: input.name,
                    attribute_type,
                    value: input.value,
                    order_index: input.order_index,
                    created_at: now,
                },
            );
        }

        let values = tables.values_of(node_id).cloned().collect();
        Ok(values)
    }
}

// ============================================================================
// Dependencies
// ============================================================================

#[async_trait]
impl DependencyStore for MemoryStore {
    async fn create_dependency(
        &self,
        dependency: NewDependency,
    ) -> Result<Dependency, UrlDbError> {
        let dependent = dependency.dependent_node_id;
        let target = dependency.dependency_node_id;
        if dependent == target {
            return Err(UrlDbError::validation("a node cannot depend on itself"));
        }

        let mut tables = self.tables.write().await;
        tables.node(dependent)?;
        tables.node(target)?;

        if tables
            .dependencies
            .values()
            .any(|d| d.dependent_node_id == dependent && d.dependency_node_id == target)
        {
            return Err(UrlDbError::already_exists(format!(
                "dependency {dependent} -> {target}"
            )));
        }
        if tables.depends_transitively(target, dependent) {
            return Err(UrlDbError::validation(format!(
                "dependency {dependent} -> {target} would create a cycle"
            )));
        }

        let created = Dependency {
            id: next(&mut tables.seq.dependency),
            dependent_node_id: dependent,
            dependency_node_id: target,
            dependency_type: dependency.dependency_type,
            cascade_delete: dependency.cascade_delete,
            cascade_update: dependency.cascade_update,
            description: dependency.description,
            created_at: Utc::now(),
        };
        tables.dependencies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_dependencies(&self, node_id: u64) -> Result<Vec<Dependency>, UrlDbError> {
        let tables = self.tables.read().await;
        tables.node(node_id)?;
        Ok(tables
            .dependencies
            .values()
            .filter(|d| d.dependent_node_id == node_id)
            .cloned()
            .collect())
    }

    async fn list_dependents(&self, node_id: u64) -> Result<Vec<Dependency>, UrlDbError> {
        let tables = self.tables.read().await;
        tables.node(node_id)?;
        Ok(tables
            .dependencies
            .values()
            .filter(|d| d.dependency_node_id == node_id)
            .cloned()
            .collect())
    }

    async fn delete_dependency(&self, id: u64) -> Result<Dependency, UrlDbError> {
        self.tables
            .write()
            .await
            .dependencies
            .remove(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("dependency {id}")))
    }
}

// ============================================================================
// Templates
// ============================================================================

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list_templates(
        &self,
        domain: &str,
        filter: TemplateFilter,
        page: usize,
        size: usize,
    ) -> Result<Page<Template>, UrlDbError> {
        let tables = self.tables.read().await;
        let domain_id = tables.domain(domain)?.id;
        let needle = filter
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());

        let all = tables
            .templates
            .values()
            .filter(|t| t.domain_id == domain_id)
            .filter(|t| filter.template_type.is_none_or(|kind| t.template_type == kind))
            .filter(|t| !filter.active_only || t.is_active)
            .filter(|t| {
                needle.as_deref().is_none_or(|needle| {
                    contains_ci(&t.name, needle)
                        || contains_ci(&t.title, needle)
                        || contains_ci(&t.description, needle)
                })
            })
            .cloned()
            .collect();
        Ok(Page::paginate(all, page, size))
    }

    async fn create_template(
        &self,
        domain: &str,
        template: NewTemplate,
    ) -> Result<Template, UrlDbError> {
        validate_template_name(&template.name)?;
        let (template_type, version) = checked_template_header(&template.template_data)?;

        let mut tables = self.tables.write().await;
        let owner = tables.domain(domain)?.clone();
        if tables.template_name_taken(owner.id, &template.name) {
            return Err(UrlDbError::already_exists(format!(
                "template '{}'",
                template.name
            )));
        }

        let now = Utc::now();
        let created = Template {
            id: next(&mut tables.seq.template),
            domain_id: owner.id,
            domain_name: owner.name,
            title: template.title.unwrap_or_else(|| template.name.clone()),
            name: template.name,
            template_type,
            version,
            description: template.description.unwrap_or_default(),
            template_data: template.template_data,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.templates.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_template(&self, id: u64) -> Result<Template, UrlDbError> {
        self.tables.read().await.template(id).cloned()
    }

    async fn update_template(
        &self,
        id: u64,
        update: TemplateUpdate,
    ) -> Result<Template, UrlDbError> {
        let header = update
            .template_data
            .as_ref()
            .map(checked_template_header)
            .transpose()?;

        let mut tables = self.tables.write().await;
        let template = tables
            .templates
            .get_mut(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("template {id}")))?;

        if !template.is_active && update.is_active != Some(true) {
            return Err(UrlDbError::validation(format!(
                "template '{}' is inactive and cannot be modified",
                template.name
            )));
        }

        if let (Some(data), Some((template_type, version))) = (update.template_data, header) {
            template.template_data = data;
            template.template_type = template_type;
            template.version = version;
        }
        if let Some(title) = update.title {
            template.title = title;
        }
        if let Some(description) = update.description {
            template.description = description;
        }
        if let Some(is_active) = update.is_active {
            template.is_active = is_active;
        }
        template.updated_at = Utc::now();
        Ok(template.clone())
    }

    async fn delete_template(&self, id: u64) -> Result<Template, UrlDbError> {
        self.tables
            .write()
            .await
            .templates
            .remove(&id)
            .ok_or_else(|| UrlDbError::not_found(format!("template {id}")))
    }

    async fn clone_template(
        &self,
        id: u64,
        new_name: &str,
        new_title: Option<String>,
        new_description: Option<String>,
    ) -> Result<Template, UrlDbError> {
        validate_template_name(new_name)?;

        let mut tables = self.tables.write().await;
        let source = tables.template(id)?.clone();
        if tables.template_name_taken(source.domain_id, new_name) {
            return Err(UrlDbError::already_exists(format!("template '{new_name}'")));
        }

        let now = Utc::now();
        let cloned = Template {
            id: next(&mut tables.seq.template),
            name: new_name.to_owned(),
            title: new_title.unwrap_or(source.title),
            description: new_description.unwrap_or(source.description),
            is_active: true,
            created_at: now,
            updated_at: now,
            ..source
        };
        tables.templates.insert(cloned.id, cloned.clone());
        Ok(cloned)
    }
}
