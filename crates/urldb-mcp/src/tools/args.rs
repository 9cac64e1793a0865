// ABOUTME: Argument decoding helpers shared by the MCP tool handlers
// ABOUTME: Lenient paging coercion, required-string checks, key parsing, and output formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use urldb::types::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use urldb::{CompositeKey, TemplateKey};

use crate::tools::ToolError;

/// Timestamp layout used in human-readable tool output
const TEXT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decode a tool's argument object into its typed struct
///
/// `null` is treated as an empty object so tools without required
/// arguments accept a bare call.
pub fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::invalid_arguments(format!("invalid arguments: {e}")))
}

/// Require a non-blank string argument, returning it trimmed
pub fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid_arguments(format!(
            "missing required argument: {field}"
        )));
    }
    Ok(trimmed)
}

/// Accept integers and integral floats, mapping anything else to `None`
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_integral(&value))
}

fn as_integral(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Resolve optional paging arguments to a valid `(page, size)` pair
///
/// Page defaults to 1 and is raised to 1. Size defaults to 20, falls back
/// to 20 below 1, and is capped at 100.
pub fn page_and_size(page: Option<i64>, size: Option<i64>) -> (usize, usize) {
    let page = page.map_or(1, |p| p.max(1) as usize);
    let size = match size {
        Some(s) if s < 1 => DEFAULT_PAGE_SIZE,
        Some(s) => (s as usize).min(MAX_PAGE_SIZE),
        None => DEFAULT_PAGE_SIZE,
    };
    (page, size)
}

/// Parse a node composite key argument
pub fn node_key(raw: &str, field: &str) -> Result<CompositeKey, ToolError> {
    let raw = required(raw, field)?;
    CompositeKey::parse(raw).map_err(|e| ToolError::invalid_arguments(format!("invalid {field}: {e}")))
}

/// Parse a template composite key argument
pub fn template_key(raw: &str, field: &str) -> Result<TemplateKey, ToolError> {
    let raw = required(raw, field)?;
    TemplateKey::parse(raw).map_err(|e| ToolError::invalid_arguments(format!("invalid {field}: {e}")))
}

/// Parse a strictly positive numeric id given as a JSON number or numeric string
pub fn positive_id(value: &Value, field: &str) -> Result<u64, ToolError> {
    let parsed = match value {
        Value::Number(_) => as_integral(value).and_then(|n| u64::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => {
            return Err(ToolError::invalid_arguments(format!(
                "missing required argument: {field}"
            )))
        }
        _ => None,
    };
    parsed
        .filter(|id| *id > 0)
        .ok_or_else(|| ToolError::invalid_arguments(format!("invalid {field}: {value}")))
}

/// Format a timestamp for text output
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format(TEXT_TIME_FORMAT).to_string()
}

/// Serialize a value for `structuredContent`
pub fn structured<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::execution(format!("result serialization failed: {e}")))
}

/// JSON Schema fragment shared by paginated tools
pub fn paging_properties() -> Value {
    json!({
        "page": {
            "type": "integer",
            "description": "Page number (default 1)",
            "minimum": 1
        },
        "size": {
            "type": "integer",
            "description": "Items per page (default 20, max 100)",
            "minimum": 1,
            "maximum": 100
        }
    })
}

/// Merge paging properties into an object schema's `properties`
pub fn with_paging(mut schema: Value) -> Value {
    if let (Some(props), Value::Object(paging)) = (
        schema.get_mut("properties").and_then(Value::as_object_mut),
        paging_properties(),
    ) {
        props.extend(paging);
    }
    schema
}

/// Serde default for flags that are on unless disabled
pub const fn default_true() -> bool {
    true
}

/// Paging arguments on their own, for tools that take nothing else
#[derive(Debug, Default, Deserialize)]
pub struct PagingArgs {
    /// Requested page
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    /// Requested page size
    #[serde(default, deserialize_with = "lenient_int")]
    pub size: Option<i64>,
}

impl PagingArgs {
    /// Coerced `(page, size)`
    pub fn resolve(&self) -> (usize, usize) {
        page_and_size(self.page, self.size)
    }
}
