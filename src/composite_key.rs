// ABOUTME: Composite key codec encoding domain-scoped entities as opaque tool:domain:id strings
// ABOUTME: Parses, validates, creates, and normalizes keys without exposing raw sequential ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Composite Keys
//!
//! Remote callers address a node with one string, `tool:domain:id`, instead of
//! a raw database id plus a separate domain lookup. Parsing is strict: exactly
//! three segments, each validated, first failure wins. Normalization only runs
//! when a key is *constructed* from a free-form display name.
//!
//! Templates use a four-segment variant, `tool:domain:template:id`, handled by
//! [`TemplateKey`] with the same per-segment rules.

use std::fmt;
use std::str::FromStr;

/// Tool name used when a key is created without an explicit one
pub const DEFAULT_TOOL_NAME: &str = "url-db";

/// Maximum length of the tool and domain segments
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum number of digits in the id segment
pub const MAX_ID_LENGTH: usize = 20;

const SEPARATOR: char = ':';
const TEMPLATE_SEGMENT: &str = "template";

// ============================================================================
// Errors
// ============================================================================

/// Error produced when a composite key cannot be parsed or created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKeyError {
    /// Which rule was violated
    pub kind: CompositeKeyErrorKind,
    /// Human-readable explanation
    pub message: String,
}

/// Categories of composite key failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKeyErrorKind {
    /// Empty input or wrong segment count
    InvalidFormat,
    /// Tool segment violates the charset or hyphen rules
    InvalidToolName,
    /// Domain segment violates the charset or hyphen rules
    InvalidDomainName,
    /// Id segment is not a positive base-10 integer
    InvalidId,
    /// A segment exceeds its length limit
    TooLong,
}

impl CompositeKeyError {
    fn new(kind: CompositeKeyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompositeKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompositeKeyError {}

// ============================================================================
// Keys
// ============================================================================

/// A decoded `tool:domain:id` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    /// Tool (server) name segment
    pub tool_name: String,
    /// Domain name segment
    pub domain_name: String,
    /// Entity id segment
    pub id: u64,
}

impl CompositeKey {
    /// Parse and validate an existing key
    ///
    /// No normalization is applied; the input must already be canonical.
    pub fn parse(input: &str) -> Result<Self, CompositeKeyError> {
        if input.is_empty() {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidFormat,
                "composite key is empty",
            ));
        }

        let parts: Vec<&str> = input.split(SEPARATOR).collect();
        let [tool_name, domain_name, id] = parts.as_slice() else {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidFormat,
                format!(
                    "composite key must have format tool:domain:id, got {} segment(s)",
                    parts.len()
                ),
            ));
        };

        validate_segment(tool_name, Segment::Tool)?;
        validate_segment(domain_name, Segment::Domain)?;
        let id = parse_id(id)?;

        Ok(Self {
            tool_name: (*tool_name).to_owned(),
            domain_name: (*domain_name).to_owned(),
            id,
        })
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tool_name, self.domain_name, self.id)
    }
}

impl FromStr for CompositeKey {
    type Err = CompositeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A decoded `tool:domain:template:id` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    /// Tool (server) name segment
    pub tool_name: String,
    /// Domain name segment
    pub domain_name: String,
    /// Template id segment
    pub id: u64,
}

impl TemplateKey {
    /// Parse and validate an existing template key
    pub fn parse(input: &str) -> Result<Self, CompositeKeyError> {
        if input.is_empty() {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidFormat,
                "template key is empty",
            ));
        }

        let parts: Vec<&str> = input.split(SEPARATOR).collect();
        let [tool_name, domain_name, marker, id] = parts.as_slice() else {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidFormat,
                format!(
                    "template key must have format tool:domain:template:id, got {} segment(s)",
                    parts.len()
                ),
            ));
        };

        if *marker != TEMPLATE_SEGMENT {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidFormat,
                format!("template key third segment must be '{TEMPLATE_SEGMENT}', got '{marker}'"),
            ));
        }

        validate_segment(tool_name, Segment::Tool)?;
        validate_segment(domain_name, Segment::Domain)?;
        let id = parse_id(id)?;

        Ok(Self {
            tool_name: (*tool_name).to_owned(),
            domain_name: (*domain_name).to_owned(),
            id,
        })
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{TEMPLATE_SEGMENT}:{}",
            self.tool_name, self.domain_name, self.id
        )
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Creates keys using a configured default tool name
#[derive(Debug, Clone)]
pub struct CompositeKeyCodec {
    tool_name: String,
}

impl Default for CompositeKeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_NAME)
    }
}

impl CompositeKeyCodec {
    /// Create a codec whose keys carry the given tool name
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
        }
    }

    /// The tool name stamped on created keys
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Create a node key under the default tool name
    pub fn create(&self, domain_name: &str, id: u64) -> Result<CompositeKey, CompositeKeyError> {
        self.create_with_tool(&self.tool_name, domain_name, id)
    }

    /// Create a node key, normalizing the tool and domain display names
    pub fn create_with_tool(
        &self,
        tool_name: &str,
        domain_name: &str,
        id: u64,
    ) -> Result<CompositeKey, CompositeKeyError> {
        let tool_name = normalize_tool_name(tool_name)?;
        let domain_name = normalize(domain_name);
        validate_segment(&domain_name, Segment::Domain)?;
        if id == 0 {
            return Err(CompositeKeyError::new(
                CompositeKeyErrorKind::InvalidId,
                "id must be a positive integer",
            ));
        }

        Ok(CompositeKey {
            tool_name,
            domain_name,
            id,
        })
    }

    /// Create a template key under the default tool name
    pub fn create_template(
        &self,
        domain_name: &str,
        id: u64,
    ) -> Result<TemplateKey, CompositeKeyError> {
        let key = self.create(domain_name, id)?;
        Ok(TemplateKey {
            tool_name: key.tool_name,
            domain_name: key.domain_name,
            id: key.id,
        })
    }

    /// Parse an existing node key
    pub fn parse(&self, input: &str) -> Result<CompositeKey, CompositeKeyError> {
        CompositeKey::parse(input)
    }

    /// Whether the input is a well-formed node key
    pub fn is_valid(&self, input: &str) -> bool {
        CompositeKey::parse(input).is_ok()
    }
}

/// Normalize a tool display name and check it is usable as a key prefix
pub fn normalize_tool_name(tool_name: &str) -> Result<String, CompositeKeyError> {
    let normalized = normalize(tool_name);
    validate_segment(&normalized, Segment::Tool)?;
    Ok(normalized)
}

/// Normalize a free-form display name into a key segment
///
/// Trims, lowercases, turns every character outside `[a-z0-9]` into a
/// separator, collapses separator runs into one hyphen, and strips
/// separators from both ends. Idempotent.
pub fn normalize(input: &str) -> String {
    let mut normalized = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('-');
            }
            pending_separator = false;
            normalized.push(c);
        } else {
            pending_separator = true;
        }
    }

    normalized
}

// ============================================================================
// Segment Validation
// ============================================================================

#[derive(Clone, Copy)]
enum Segment {
    Tool,
    Domain,
}

impl Segment {
    const fn label(self) -> &'static str {
        match self {
            Self::Tool => "tool name",
            Self::Domain => "domain name",
        }
    }

    const fn error_kind(self) -> CompositeKeyErrorKind {
        match self {
            Self::Tool => CompositeKeyErrorKind::InvalidToolName,
            Self::Domain => CompositeKeyErrorKind::InvalidDomainName,
        }
    }
}

/// Validate a name segment against the key charset rules
pub fn is_valid_name_segment(value: &str) -> bool {
    validate_segment(value, Segment::Domain).is_ok()
}

fn validate_segment(value: &str, segment: Segment) -> Result<(), CompositeKeyError> {
    let label = segment.label();

    if value.is_empty() {
        return Err(CompositeKeyError::new(
            segment.error_kind(),
            format!("{label} cannot be empty"),
        ));
    }

    if value.len() > MAX_NAME_LENGTH {
        return Err(CompositeKeyError::new(
            CompositeKeyErrorKind::TooLong,
            format!("{label} exceeds {MAX_NAME_LENGTH} characters"),
        ));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CompositeKeyError::new(
            segment.error_kind(),
            format!("{label} '{value}' may only contain letters, digits, '_' and '-'"),
        ));
    }

    if value.starts_with('-') || value.ends_with('-') {
        return Err(CompositeKeyError::new(
            segment.error_kind(),
            format!("{label} '{value}' cannot start or end with '-'"),
        ));
    }

    Ok(())
}

fn parse_id(value: &str) -> Result<u64, CompositeKeyError> {
    if value.len() > MAX_ID_LENGTH {
        return Err(CompositeKeyError::new(
            CompositeKeyErrorKind::TooLong,
            format!("id exceeds {MAX_ID_LENGTH} digits"),
        ));
    }

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CompositeKeyError::new(
            CompositeKeyErrorKind::InvalidId,
            format!("id '{value}' is not a base-10 integer"),
        ));
    }

    match value.parse::<u64>() {
        Ok(0) => Err(CompositeKeyError::new(
            CompositeKeyErrorKind::InvalidId,
            "id must be a positive integer",
        )),
        Ok(id) => Ok(id),
        Err(_) => Err(CompositeKeyError::new(
            CompositeKeyErrorKind::InvalidId,
            format!("id '{value}' is out of range"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create_round_trip() {
        let codec = CompositeKeyCodec::default();
        for (domain, id) in [("tech", 1), ("my_links", 42), ("a-b", u64::MAX)] {
            let key = codec.create(domain, id).expect("create");
            let parsed = CompositeKey::parse(&key.to_string()).expect("parse");
            assert_eq!(parsed, key);
            assert_eq!(parsed.tool_name, "url-db");
            assert_eq!(parsed.id, id);
        }
    }

    #[test]
    fn parse_preserves_case_and_underscores() {
        let key = CompositeKey::parse("My_Tool:Some_Domain:7").expect("parse");
        assert_eq!(key.tool_name, "My_Tool");
        assert_eq!(key.domain_name, "Some_Domain");
    }

    #[test]
    fn wrong_segment_count_rejected() {
        for input in ["url-db:tech", "url-db:tech:1:2", "tech", "url-db:te:ch:1"] {
            let err = CompositeKey::parse(input).expect_err(input);
            assert_eq!(err.kind, CompositeKeyErrorKind::InvalidFormat, "{input}");
            assert!(!CompositeKeyCodec::default().is_valid(input));
        }
    }

    #[test]
    fn empty_input_rejected() {
        let err = CompositeKey::parse("").expect_err("empty");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidFormat);
    }

    #[test]
    fn non_positive_or_non_numeric_id_rejected() {
        for input in [
            "url-db:tech-articles:0",
            "url-db:tech:-1",
            "url-db:tech:abc",
            "url-db:tech:1.5",
            "url-db:tech:",
            "url-db:tech:+3",
        ] {
            let err = CompositeKey::parse(input).expect_err(input);
            assert_eq!(err.kind, CompositeKeyErrorKind::InvalidId, "{input}");
        }
    }

    #[test]
    fn overlong_segments_rejected() {
        let long_name = "a".repeat(MAX_NAME_LENGTH + 1);
        let err = CompositeKey::parse(&format!("url-db:{long_name}:1")).expect_err("long");
        assert_eq!(err.kind, CompositeKeyErrorKind::TooLong);

        let long_id = "1".repeat(MAX_ID_LENGTH + 1);
        let err = CompositeKey::parse(&format!("url-db:tech:{long_id}")).expect_err("id");
        assert_eq!(err.kind, CompositeKeyErrorKind::TooLong);
    }

    #[test]
    fn twenty_digit_overflow_is_invalid_id() {
        let err = CompositeKey::parse("url-db:tech:99999999999999999999").expect_err("overflow");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidId);
    }

    #[test]
    fn hyphen_edges_and_charset_rejected() {
        let err = CompositeKey::parse("-tool:tech:1").expect_err("leading");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidToolName);
        let err = CompositeKey::parse("url-db:tech-:1").expect_err("trailing");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidDomainName);
        let err = CompositeKey::parse("url-db:te ch:1").expect_err("space");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidDomainName);
    }

    #[test]
    fn normalize_display_names() {
        assert_eq!(normalize("  My Domain!!  "), "my-domain");
        assert_eq!(normalize("Tech Articles"), "tech-articles");
        assert_eq!(normalize("a__b--c"), "a-b-c");
        assert_eq!(normalize("---"), "");
        assert_eq!(normalize("Ünïcode Name"), "n-code-name");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["  My Domain!!  ", "Tech_Articles", "x", "--a--", "Rust & Go"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "{input}");
        }
    }

    #[test]
    fn create_normalizes_display_names() {
        let codec = CompositeKeyCodec::new("URL DB");
        let key = codec.create("Tech Articles", 3).expect("create");
        assert_eq!(key.to_string(), "url-db:tech-articles:3");
    }

    #[test]
    fn create_rejects_unusable_names() {
        let codec = CompositeKeyCodec::default();
        assert!(codec.create("!!!", 1).is_err());
        assert!(codec.create("tech", 0).is_err());
    }

    #[test]
    fn template_key_round_trip() {
        let codec = CompositeKeyCodec::default();
        let key = codec.create_template("Design Docs", 9).expect("create");
        assert_eq!(key.to_string(), "url-db:design-docs:template:9");
        assert_eq!(TemplateKey::parse(&key.to_string()).expect("parse"), key);
    }

    #[test]
    fn template_key_requires_marker_segment() {
        let err = TemplateKey::parse("url-db:docs:node:9").expect_err("marker");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidFormat);
        let err = TemplateKey::parse("url-db:docs:9").expect_err("count");
        assert_eq!(err.kind, CompositeKeyErrorKind::InvalidFormat);
    }
}
