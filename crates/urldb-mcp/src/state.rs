// ABOUTME: Shared tool context holding the store handle, key codec, and server settings
// ABOUTME: Resolves composite ids to store entities and renders entities back to composite ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use urldb::composite_key::normalize;
use urldb::types::{Node, Template};
use urldb::{CompositeKeyCodec, ServerConfig, UrlDbError, UrlStore};

use crate::tools::{args, ToolError};

/// Type alias for the shared context handle used across the server
pub type SharedContext = Arc<ToolContext>;

/// Everything a tool handler needs to run
///
/// Immutable after startup; the store provides its own synchronization.
pub struct ToolContext {
    store: Arc<dyn UrlStore>,
    codec: CompositeKeyCodec,
    mode: String,
    auto_create_attributes: bool,
}

impl ToolContext {
    /// Build a context over the given store using the resolved configuration
    pub fn new(store: Arc<dyn UrlStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            codec: CompositeKeyCodec::new(normalize(&config.tool_name)),
            mode: config.mcp_mode.clone(),
            auto_create_attributes: config.auto_create_attributes,
        }
    }

    /// The backing store
    pub fn store(&self) -> &dyn UrlStore {
        self.store.as_ref()
    }

    /// The composite key codec
    pub const fn codec(&self) -> &CompositeKeyCodec {
        &self.codec
    }

    /// Transport mode the server was started in
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Default for `set_node_attributes` when the caller omits the flag
    pub const fn auto_create_attributes(&self) -> bool {
        self.auto_create_attributes
    }

    /// Composite id of a node
    pub fn node_key(&self, node: &Node) -> Result<String, ToolError> {
        self.codec
            .create(&node.domain_name, node.id)
            .map(|key| key.to_string())
            .map_err(|e| ToolError::execution(format!("cannot build composite id: {e}")))
    }

    /// Composite id of a template
    pub fn template_key(&self, template: &Template) -> Result<String, ToolError> {
        self.codec
            .create_template(&template.domain_name, template.id)
            .map(|key| key.to_string())
            .map_err(|e| ToolError::execution(format!("cannot build composite id: {e}")))
    }

    /// Decode a node composite id argument and load the node
    ///
    /// The key's domain segment must match the node's domain.
    pub async fn resolve_node(&self, raw: &str, field: &str) -> Result<Node, ToolError> {
        let key = args::node_key(raw, field)?;
        let node = self.store.get_node(key.id).await?;
        if node.domain_name != normalize(&key.domain_name) {
            return Err(UrlDbError::not_found(format!("node '{key}'")).into());
        }
        Ok(node)
    }

    /// Decode a template composite id argument and load the template
    pub async fn resolve_template(&self, raw: &str, field: &str) -> Result<Template, ToolError> {
        let key = args::template_key(raw, field)?;
        let template = self.store.get_template(key.id).await?;
        if template.domain_name != normalize(&key.domain_name) {
            return Err(UrlDbError::not_found(format!("template '{key}'")).into());
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use urldb::store::{DomainStore, NodeStore};
    use urldb::types::NewNode;
    use urldb::MemoryStore;

    use super::*;
    use crate::tools::ToolErrorKind;

    async fn context_with_node() -> (ToolContext, Node) {
        let store = Arc::new(MemoryStore::new());
        store.create_domain("docs", "").await.expect("domain");
        let node = store
            .create_node(
                "docs",
                NewNode {
                    url: "https://example.com".to_owned(),
                    ..NewNode::default()
                },
            )
            .await
            .expect("node");
        (ToolContext::new(store, &ServerConfig::default()), node)
    }

    #[tokio::test]
    async fn node_key_round_trips_through_resolve() {
        let (ctx, node) = context_with_node().await;
        let key = ctx.node_key(&node).expect("key");
        assert_eq!(key, format!("url-db:docs:{}", node.id));

        let resolved = ctx.resolve_node(&key, "composite_id").await.expect("resolve");
        assert_eq!(resolved.id, node.id);
    }

    #[tokio::test]
    async fn domain_mismatch_is_not_found() {
        let (ctx, node) = context_with_node().await;
        let err = ctx
            .resolve_node(&format!("url-db:other:{}", node.id), "composite_id")
            .await
            .expect_err("mismatch");
        assert_eq!(err.kind, ToolErrorKind::Execution);
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn malformed_key_is_an_argument_error() {
        let (ctx, _) = context_with_node().await;
        let err = ctx
            .resolve_node("url-db:docs", "composite_id")
            .await
            .expect_err("malformed");
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
        assert!(err.message.starts_with("invalid composite_id"));
    }

    #[test]
    fn context_reflects_config() {
        let config = ServerConfig {
            mcp_mode: "http".to_owned(),
            auto_create_attributes: false,
            ..ServerConfig::default()
        }
        .with_tool_name("bookmarks");
        let ctx = ToolContext::new(Arc::new(MemoryStore::new()), &config);
        assert_eq!(ctx.mode(), "http");
        assert_eq!(ctx.codec().tool_name(), "bookmarks");
        assert!(!ctx.auto_create_attributes());
    }
}
