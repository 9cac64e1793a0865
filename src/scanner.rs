// ABOUTME: Token-budgeted scan over every node of a domain for LLM context loading
// ABOUTME: Estimates token cost per node, pages by budget, and optionally compresses attributes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Content Scanner
//!
//! Lets an agent walk a whole domain in pages sized by an approximate token
//! budget instead of a fixed item count. Token cost is a heuristic (four
//! bytes per token plus JSON overhead); it only has to be stable, not exact.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::composite_key::CompositeKeyCodec;
use crate::store::UrlStore;
use crate::types::{AttributeType, NodeAttribute, UrlDbError};

/// Token budget used when the caller gives none
pub const DEFAULT_MAX_TOKENS_PER_PAGE: usize = 3000;

/// Hard ceiling for the per-page token budget
pub const MAX_TOKENS_PER_PAGE: usize = 5000;

/// Floor for the per-node token estimate
pub const MIN_TOKENS_PER_NODE: usize = 20;

/// Average node cost used to size pages before fetching
pub const AVG_TOKENS_PER_NODE: usize = 100;

/// Parameters of one scan page
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Domain display name
    pub domain_name: String,
    /// Token budget; values <= 0 fall back to the default
    pub max_tokens_per_page: i64,
    /// 1-based page; values <= 0 become 1
    pub page: i64,
    /// Attach attribute values to each item
    pub include_attributes: bool,
    /// Drop repeated `name:value` pairs and report a summary
    pub compress_attributes: bool,
}

/// One page of scanned content
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    /// Nodes on this page
    pub items: Vec<ScanItem>,
    /// Navigation details
    pub pagination: ScanPagination,
    /// Whole-domain statistics
    pub metadata: ScanMetadata,
}

/// A scanned node
#[derive(Debug, Clone, Serialize)]
pub struct ScanItem {
    /// Internal id
    pub id: u64,
    /// Opaque key for follow-up tool calls
    pub composite_id: String,
    /// The URL
    pub content: String,
    /// Title, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attribute values, omitted when not requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<ScanAttribute>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Attribute value as reported by a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanAttribute {
    /// Attribute name
    pub name: String,
    /// Raw value
    pub value: String,
    /// Attribute type
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Ordering index, when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

/// Navigation details for a scan page
#[derive(Debug, Clone, Serialize)]
pub struct ScanPagination {
    /// Page returned
    pub current_page: usize,
    /// Pages at the estimated nodes-per-page
    pub total_pages: usize,
    /// Estimated tokens of the returned items
    pub current_tokens: usize,
    /// A later page exists
    pub has_more: bool,
    /// An earlier page exists
    pub has_previous: bool,
}

/// Whole-domain statistics for a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanMetadata {
    /// Nodes in the domain
    pub total_nodes: usize,
    /// Nodes returned on this page
    pub processed_nodes: usize,
    /// Estimated tokens for the whole domain
    pub estimated_tokens: usize,
    /// Estimated pages for the whole domain
    pub estimated_pages: usize,
    /// Compression report, present when compression ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_summary: Option<AttributeSummary>,
    /// Whether compression was requested
    pub compressed_output: bool,
}

/// Duplicate statistics gathered while compressing attributes
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributeSummary {
    /// Attribute name to its distinct values
    pub unique_values: BTreeMap<String, Vec<String>>,
    /// `name:value` to occurrence count
    pub value_counts: BTreeMap<String, usize>,
    /// Attribute name to its most frequent value
    pub most_common_values: BTreeMap<String, String>,
    /// Occurrences beyond the first of every value
    pub total_duplicates_removed: usize,
}

/// Scan one page of a domain
pub async fn scan_all_content(
    store: &dyn UrlStore,
    codec: &CompositeKeyCodec,
    request: &ScanRequest,
) -> Result<ScanResponse, UrlDbError> {
    let domain = store.get_domain(&request.domain_name).await?;

    let max_tokens = usize::try_from(request.max_tokens_per_page)
        .ok()
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_MAX_TOKENS_PER_PAGE)
        .min(MAX_TOKENS_PER_PAGE);
    let page = usize::try_from(request.page)
        .ok()
        .filter(|p| *p > 0)
        .unwrap_or(1);

    let avg_tokens = if request.include_attributes {
        AVG_TOKENS_PER_NODE * 3 / 2
    } else {
        AVG_TOKENS_PER_NODE
    };
    let nodes_per_page = (max_tokens / avg_tokens).max(1);

    let slice = store
        .list_nodes(&domain.name, page, nodes_per_page, None)
        .await?;
    let total_nodes = slice.total_count;

    if total_nodes == 0 {
        return Ok(ScanResponse {
            items: Vec::new(),
            pagination: ScanPagination {
                current_page: 1,
                total_pages: 1,
                current_tokens: 0,
                has_more: false,
                has_previous: false,
            },
            metadata: ScanMetadata {
                total_nodes: 0,
                processed_nodes: 0,
                estimated_tokens: 0,
                estimated_pages: 1,
                attribute_summary: None,
                compressed_output: request.compress_attributes,
            },
        });
    }

    let mut attributes_by_node: HashMap<u64, Vec<NodeAttribute>> = HashMap::new();
    if request.include_attributes {
        for node in &slice.items {
            attributes_by_node.insert(node.id, store.get_node_attributes(node.id).await?);
        }
    }

    let summary = (request.include_attributes && request.compress_attributes)
        .then(|| summarize(attributes_by_node.values()));

    let mut items = Vec::with_capacity(slice.items.len());
    let mut current_tokens = 0;
    for node in slice.items {
        let attributes = request.include_attributes.then(|| {
            let values = attributes_by_node.remove(&node.id).unwrap_or_default();
            if request.compress_attributes {
                dedupe(values)
            } else {
                values.into_iter().map(ScanAttribute::from).collect()
            }
        });

        let composite_id = codec
            .create(&node.domain_name, node.id)
            .map_err(|e| UrlDbError::internal(format!("cannot build composite id: {e}")))?
            .to_string();

        let item = ScanItem {
            id: node.id,
            composite_id,
            content: node.url,
            title: Some(node.title).filter(|t| !t.is_empty()),
            description: Some(node.description).filter(|d| !d.is_empty()),
            attributes,
            created_at: node.created_at,
            updated_at: node.updated_at,
        };
        current_tokens += estimate_tokens(&item);
        items.push(item);
    }

    let estimated_tokens = total_nodes * avg_tokens;
    Ok(ScanResponse {
        pagination: ScanPagination {
            current_page: page,
            total_pages: slice.total_pages,
            current_tokens,
            has_more: page < slice.total_pages,
            has_previous: page > 1,
        },
        metadata: ScanMetadata {
            total_nodes,
            processed_nodes: items.len(),
            estimated_tokens,
            estimated_pages: estimated_tokens / max_tokens + 1,
            attribute_summary: summary,
            compressed_output: request.compress_attributes,
        },
        items,
    })
}

impl From<NodeAttribute> for ScanAttribute {
    fn from(value: NodeAttribute) -> Self {
        Self {
            name: value.name,
            value: value.value,
            attribute_type: value.attribute_type,
            order_index: value.order_index,
        }
    }
}

/// Estimated token cost of one item: bytes / 4 per field, 20 % overhead, floor of 20
pub fn estimate_tokens(item: &ScanItem) -> usize {
    let mut tokens = item.content.len() / 4;
    tokens += item.title.as_ref().map_or(0, |t| t.len() / 4);
    tokens += item.description.as_ref().map_or(0, |d| d.len() / 4);
    for attribute in item.attributes.iter().flatten() {
        tokens += attribute.name.len() / 4;
        tokens += attribute.value.len() / 4;
        tokens += attribute.attribute_type.as_str().len() / 4;
    }
    (tokens * 6 / 5).max(MIN_TOKENS_PER_NODE)
}

fn summarize<'a>(all: impl Iterator<Item = &'a Vec<NodeAttribute>>) -> AttributeSummary {
    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for value in all.flatten() {
        *counts
            .entry(value.name.as_str())
            .or_default()
            .entry(value.value.as_str())
            .or_default() += 1;
    }

    let mut summary = AttributeSummary::default();
    for (name, values) in counts {
        let mut most_common = ("", 0);
        for (value, count) in &values {
            summary
                .value_counts
                .insert(format!("{name}:{value}"), *count);
            summary.total_duplicates_removed += count - 1;
            if *count > most_common.1 {
                most_common = (*value, *count);
            }
        }
        summary
            .most_common_values
            .insert(name.to_owned(), most_common.0.to_owned());
        summary.unique_values.insert(
            name.to_owned(),
            values.keys().map(|v| (*v).to_owned()).collect(),
        );
    }
    summary
}

fn dedupe(values: Vec<NodeAttribute>) -> Vec<ScanAttribute> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(format!("{}:{}", v.name, v.value)))
        .map(ScanAttribute::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AttributeStore, DomainStore, MemoryStore, NodeStore};
    use crate::types::{AttributeValueInput, NewNode};

    async fn store_with_nodes(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_domain("docs", "").await.expect("domain");
        for i in 0..count {
            let node = store
                .create_node(
                    "docs",
                    NewNode {
                        url: format!("https://example.com/{i}"),
                        title: Some(format!("Page {i}")),
                        description: None,
                    },
                )
                .await
                .expect("node");
            store
                .set_node_attributes(
                    node.id,
                    vec![AttributeValueInput {
                        name: "lang".to_owned(),
                        value: if i % 2 == 0 { "rust" } else { "go" }.to_owned(),
                        order_index: None,
                    }],
                    true,
                )
                .await
                .expect("attrs");
        }
        store
    }

    fn request(page: i64, max_tokens: i64, include: bool, compress: bool) -> ScanRequest {
        ScanRequest {
            domain_name: "docs".to_owned(),
            max_tokens_per_page: max_tokens,
            page,
            include_attributes: include,
            compress_attributes: compress,
        }
    }

    #[tokio::test]
    async fn empty_domain_returns_single_empty_page() {
        let store = store_with_nodes(0).await;
        let codec = CompositeKeyCodec::default();
        let result = scan_all_content(&store, &codec, &request(3, 0, true, false))
            .await
            .expect("scan");
        assert!(result.items.is_empty());
        assert_eq!(result.pagination.current_page, 1);
        assert_eq!(result.metadata.estimated_pages, 1);
    }

    #[tokio::test]
    async fn pages_are_sized_by_token_budget() {
        let store = store_with_nodes(25).await;
        let codec = CompositeKeyCodec::default();

        // 1500 / 150 = 10 nodes per page with attributes
        let first = scan_all_content(&store, &codec, &request(1, 1500, true, false))
            .await
            .expect("scan");
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.pagination.total_pages, 3);
        assert!(first.pagination.has_more);
        assert!(!first.pagination.has_previous);
        assert_eq!(first.items[0].composite_id, "url-db:docs:1");

        let last = scan_all_content(&store, &codec, &request(3, 1500, true, false))
            .await
            .expect("scan");
        assert_eq!(last.items.len(), 5);
        assert!(!last.pagination.has_more);
        assert!(last.pagination.has_previous);
    }

    #[tokio::test]
    async fn budget_is_clamped_and_page_defaults() {
        let store = store_with_nodes(60).await;
        let codec = CompositeKeyCodec::default();
        let result = scan_all_content(&store, &codec, &request(-4, 100_000, false, false))
            .await
            .expect("scan");
        // 5000 / 100 = 50 nodes per page without attributes
        assert_eq!(result.items.len(), 50);
        assert_eq!(result.pagination.current_page, 1);
        assert!(result.items[0].attributes.is_none());
    }

    #[tokio::test]
    async fn compression_reports_duplicates() {
        let store = store_with_nodes(5).await;
        let codec = CompositeKeyCodec::default();
        let result = scan_all_content(&store, &codec, &request(1, 3000, true, true))
            .await
            .expect("scan");
        let summary = result.metadata.attribute_summary.expect("summary");
        assert_eq!(summary.value_counts.get("lang:rust"), Some(&3));
        assert_eq!(summary.value_counts.get("lang:go"), Some(&2));
        assert_eq!(summary.total_duplicates_removed, 3);
        assert_eq!(
            summary.most_common_values.get("lang").map(String::as_str),
            Some("rust")
        );
        assert!(result.metadata.compressed_output);
    }

    #[tokio::test]
    async fn unknown_domain_errors() {
        let store = MemoryStore::new();
        let codec = CompositeKeyCodec::default();
        assert!(scan_all_content(&store, &codec, &request(1, 0, true, false))
            .await
            .is_err());
    }

    #[test]
    fn token_estimate_has_floor() {
        let item = ScanItem {
            id: 1,
            composite_id: "url-db:d:1".to_owned(),
            content: "https://a".to_owned(),
            title: None,
            description: None,
            attributes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(estimate_tokens(&item), MIN_TOKENS_PER_NODE);
    }
}
