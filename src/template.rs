// ABOUTME: Template document validation and per-type scaffold generation
// ABOUTME: Checks version and type fields, reports path-addressed errors, builds starter JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::types::{TemplateType, ALL_TEMPLATE_TYPES};

/// Outcome of validating a template document
#[derive(Debug, Clone, Serialize)]
pub struct TemplateValidation {
    /// Whether the document passed every check
    pub valid: bool,
    /// Individual failures, empty when valid
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TemplateIssue>,
}

/// One validation failure addressed by a JSON path
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TemplateIssue {
    /// JSON path of the offending field (`$` is the document root)
    pub path: String,
    /// What is wrong
    pub message: String,
    /// The offending value, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl TemplateIssue {
    fn new(path: &str, message: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.to_owned(),
            message: message.into(),
            value,
        }
    }
}

impl TemplateValidation {
    fn failed(errors: Vec<TemplateIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Accept template data either as a JSON object or as JSON text
pub fn decode_template_data(raw: &Value) -> Result<Value, TemplateIssue> {
    match raw {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| TemplateIssue::new("$", format!("Invalid JSON: {e}"), None)),
        other => Ok(other.clone()),
    }
}

/// Validate a decoded template document
pub fn validate_template(data: &Value) -> TemplateValidation {
    let Some(object) = data.as_object() else {
        return TemplateValidation::failed(vec![TemplateIssue::new(
            "$",
            "Template data must be an object",
            None,
        )]);
    };

    let mut errors = Vec::new();

    match object.get("version") {
        None => errors.push(TemplateIssue::new("$.version", "Version field is required", None)),
        Some(Value::String(version)) if is_valid_version(version) => {}
        Some(Value::String(version)) => errors.push(TemplateIssue::new(
            "$.version",
            "Invalid semantic version format",
            Some(Value::String(version.clone())),
        )),
        Some(_) => errors.push(TemplateIssue::new("$.version", "Version must be a string", None)),
    }

    match object.get("type") {
        None => errors.push(TemplateIssue::new("$.type", "Type field is required", None)),
        Some(Value::String(kind)) if TemplateType::parse(kind).is_some() => {}
        Some(Value::String(kind)) => errors.push(TemplateIssue::new(
            "$.type",
            "Invalid template type",
            Some(Value::String(kind.clone())),
        )),
        Some(_) => errors.push(TemplateIssue::new("$.type", "Type must be a string", None)),
    }

    TemplateValidation::failed(errors)
}

/// Extract the type and version of a document that passed validation
pub fn template_header(data: &Value) -> Option<(TemplateType, String)> {
    let kind = data.get("type").and_then(Value::as_str).and_then(TemplateType::parse)?;
    let version = data.get("version").and_then(Value::as_str)?;
    Some((kind, version.to_owned()))
}

/// `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`, the last part may carry `-prerelease`
fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }

    let last = parts.len() - 1;
    parts.iter().enumerate().all(|(i, part)| {
        let numeric = if i == last {
            match part.split_once('-') {
                Some((number, pre)) => {
                    if pre.is_empty() {
                        return false;
                    }
                    number
                }
                None => part,
            }
        } else {
            part
        };
        !numeric.is_empty() && numeric.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Comma-separated list of valid template type names
pub fn valid_template_type_names() -> String {
    ALL_TEMPLATE_TYPES
        .iter()
        .map(TemplateType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Starter document for the given template type
pub fn scaffold(template_type: TemplateType) -> Value {
    let mut doc = Map::new();
    doc.insert("version".to_owned(), json!("1.0"));
    doc.insert("type".to_owned(), json!(template_type.as_str()));

    match template_type {
        TemplateType::Layout => {
            doc.insert(
                "metadata".to_owned(),
                json!({"name": "", "description": "", "tags": []}),
            );
            doc.insert(
                "content".to_owned(),
                json!({"structure": {"type": "grid", "areas": []}}),
            );
            doc.insert(
                "presentation".to_owned(),
                json!({"theme": "light", "responsive": true}),
            );
        }
        TemplateType::Form => {
            doc.insert("metadata".to_owned(), json!({"name": "", "description": ""}));
            doc.insert("schema".to_owned(), json!({"fields": [], "sections": []}));
            doc.insert("validation".to_owned(), json!({"rules": {}}));
            doc.insert("presentation".to_owned(), json!({"layout": "vertical"}));
        }
        TemplateType::Document => {
            doc.insert("metadata".to_owned(), json!({"name": ""}));
            doc.insert("schema".to_owned(), json!({"sections": []}));
        }
        TemplateType::Custom => {
            doc.insert("metadata".to_owned(), json!({"name": ""}));
            doc.insert("content".to_owned(), json!({}));
        }
    }

    Value::Object(doc)
}
