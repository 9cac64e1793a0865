// ABOUTME: Attribute value validation per attribute type (tag, number, markdown, image, ...)
// ABOUTME: Enforces length limits, ordering requirements, and URL or data-URI image formats
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::types::{AttributeType, UrlDbError};

const MAX_TAG_LENGTH: usize = 255;
const MAX_STRING_LENGTH: usize = 2048;
const MAX_MARKDOWN_LENGTH: usize = 10_000;
const MAX_IMAGE_LENGTH: usize = 2048;

/// Validate a raw attribute value against its declared type
pub fn validate_attribute_value(
    attribute_type: AttributeType,
    value: &str,
    order_index: Option<i64>,
) -> Result<(), UrlDbError> {
    if value.is_empty() {
        return Err(UrlDbError::validation("attribute value is required"));
    }

    match attribute_type {
        AttributeType::Tag => check_length(value, MAX_TAG_LENGTH, "tag"),
        AttributeType::OrderedTag => {
            check_length(value, MAX_TAG_LENGTH, "ordered_tag")?;
            if order_index.is_none() {
                return Err(UrlDbError::validation(
                    "order_index is required for ordered_tag attributes",
                ));
            }
            Ok(())
        }
        AttributeType::Number => match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(()),
            _ => Err(UrlDbError::validation(format!(
                "'{value}' is not a valid number"
            ))),
        },
        AttributeType::String => check_length(value, MAX_STRING_LENGTH, "string"),
        AttributeType::Markdown => {
            check_length(value, MAX_MARKDOWN_LENGTH, "markdown")?;
            validate_markdown_links(value)
        }
        AttributeType::Image => {
            check_length(value, MAX_IMAGE_LENGTH, "image")?;
            validate_image(value)
        }
    }
}

fn check_length(value: &str, max: usize, label: &str) -> Result<(), UrlDbError> {
    if value.chars().count() > max {
        return Err(UrlDbError::validation(format!(
            "{label} value exceeds {max} characters"
        )));
    }
    Ok(())
}

/// Every `[text](target)` link needs non-empty text and target
fn validate_markdown_links(value: &str) -> Result<(), UrlDbError> {
    let mut rest = value;
    while let Some(start) = rest.find("](") {
        let text_start = rest[..start].rfind('[');
        let Some(end) = rest[start + 2..].find(')') else {
            return Err(UrlDbError::validation("markdown link is missing ')'"));
        };
        let target = rest[start + 2..start + 2 + end].trim();
        let text = text_start.map_or("", |s| rest[s + 1..start].trim());

        if text.is_empty() || target.is_empty() {
            return Err(UrlDbError::validation(
                "markdown link must have both text and target",
            ));
        }
        rest = &rest[start + 2 + end + 1..];
    }
    Ok(())
}

/// Accept absolute http(s) URLs with a host, or base64 image data URIs
fn validate_image(value: &str) -> Result<(), UrlDbError> {
    if let Some(data) = value.strip_prefix("data:image/") {
        let Some((format, payload)) = data.split_once(";base64,") else {
            return Err(UrlDbError::validation(
                "image data URI must have the form data:image/<format>;base64,<data>",
            ));
        };
        if format.is_empty() {
            return Err(UrlDbError::validation("image data URI is missing a format"));
        }
        return STANDARD
            .decode(payload)
            .map(|_| ())
            .map_err(|e| UrlDbError::validation(format!("image data is not valid base64: {e}")));
    }

    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| UrlDbError::validation("image value must be an http(s) URL or data URI"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(UrlDbError::validation("image URL must include a host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_rejected_for_every_type() {
        for t in crate::types::ALL_ATTRIBUTE_TYPES {
            assert!(validate_attribute_value(*t, "", Some(1)).is_err(), "{t}");
        }
    }

    #[test]
    fn ordered_tag_requires_order_index() {
        assert!(validate_attribute_value(AttributeType::OrderedTag, "first", None).is_err());
        assert!(validate_attribute_value(AttributeType::OrderedTag, "first", Some(0)).is_ok());
    }

    #[test]
    fn tag_length_limit() {
        let long = "t".repeat(256);
        assert!(validate_attribute_value(AttributeType::Tag, &long, None).is_err());
        assert!(validate_attribute_value(AttributeType::Tag, "rust", None).is_ok());
    }

    #[test]
    fn numbers_must_parse() {
        assert!(validate_attribute_value(AttributeType::Number, "3.14", None).is_ok());
        assert!(validate_attribute_value(AttributeType::Number, "-7", None).is_ok());
        assert!(validate_attribute_value(AttributeType::Number, "seven", None).is_err());
        assert!(validate_attribute_value(AttributeType::Number, "NaN", None).is_err());
    }

    #[test]
    fn markdown_links_checked() {
        let ok = "# Title\nSee [docs](https://example.com) and [more](./x).";
        assert!(validate_attribute_value(AttributeType::Markdown, ok, None).is_ok());
        assert!(validate_attribute_value(AttributeType::Markdown, "[](https://x)", None).is_err());
        assert!(validate_attribute_value(AttributeType::Markdown, "[x]( )", None).is_err());
        assert!(validate_attribute_value(AttributeType::Markdown, "[x](open", None).is_err());
    }

    #[test]
    fn images_accept_urls_and_data_uris() {
        let t = AttributeType::Image;
        assert!(validate_attribute_value(t, "https://example.com/a.png", None).is_ok());
        assert!(validate_attribute_value(t, "http://cdn.example.com", None).is_ok());
        assert!(validate_attribute_value(t, "data:image/png;base64,aGVsbG8=", None).is_ok());
        assert!(validate_attribute_value(t, "data:image/png;base64,@@@", None).is_err());
        assert!(validate_attribute_value(t, "ftp://example.com/a.png", None).is_err());
        assert!(validate_attribute_value(t, "https:///a.png", None).is_err());
    }
}
