// ABOUTME: URL knowledge-base library: domains, nodes, attributes, dependencies, and templates
// ABOUTME: Re-exports the store boundary, composite key codec, validators, and content scanner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # url-db
//!
//! Business layer behind the `url-db` MCP server. URLs ("nodes") are grouped
//! into named domains, carry typed attribute values, may depend on each other,
//! and are addressed externally through composite keys of the form
//! `tool:domain:id`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use urldb::store::{DomainStore, NodeStore};
//! use urldb::types::NewNode;
//! use urldb::{CompositeKeyCodec, MemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let codec = CompositeKeyCodec::default();
//!
//! store.create_domain("Tech Articles", "Reading list").await?;
//! let node = store
//!     .create_node(
//!         "tech-articles",
//!         NewNode {
//!             url: "https://example.com".to_owned(),
//!             ..NewNode::default()
//!         },
//!     )
//!     .await?;
//! println!("{}", codec.create(&node.domain_name, node.id)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities, pagination, and the error type
//! - [`composite_key`] - `tool:domain:id` encoding, parsing, and name normalization
//! - [`validation`] - Per-type attribute value rules
//! - [`template`] - Template document validation and scaffolds
//! - [`store`] - Async store traits and the in-memory implementation
//! - [`scanner`] - Token-budgeted paging over a whole domain
//! - [`config`] - Server configuration layering

/// Core types: entities, pagination, and errors
pub mod types;

/// Composite key codec and name normalization
pub mod composite_key;
/// Server configuration
pub mod config;
/// Token-budgeted content scanner
pub mod scanner;
/// Store traits and implementations
pub mod store;
/// Template validation and scaffolding
pub mod template;
/// Attribute value validation
pub mod validation;

pub use composite_key::{CompositeKey, CompositeKeyCodec, TemplateKey};
pub use config::ServerConfig;
pub use store::{MemoryStore, UrlStore};
pub use types::{ErrorKind, UrlDbError};
