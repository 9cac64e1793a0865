// ABOUTME: Server configuration layered from defaults, optional TOML file, environment, and CLI
// ABOUTME: Defines transport mode, bind address, tool name, per-call timeout, and attribute policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use serde::Deserialize;

use crate::composite_key::{normalize_tool_name, DEFAULT_TOOL_NAME};
use crate::types::UrlDbError;

/// Default transport mode
pub const DEFAULT_MODE: &str = "stdio";

/// Default HTTP/SSE listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default HTTP/SSE listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default deadline for a single tool call (30 seconds)
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Environment variable keys read by [`ConfigOverrides::from_env`]
pub const ENV_MODE: &str = "MCP_MODE";
/// Listen port override
pub const ENV_PORT: &str = "PORT";
/// Tool name override
pub const ENV_TOOL_NAME: &str = "URLDB_TOOL_NAME";
/// Tool timeout override, in seconds
pub const ENV_TOOL_TIMEOUT: &str = "URLDB_TOOL_TIMEOUT_SECS";
/// Default for `auto_create_attributes`
pub const ENV_AUTO_CREATE_ATTRIBUTES: &str = "AUTO_CREATE_ATTRIBUTES";

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Transport mode name (validated by the transport factory)
    pub mcp_mode: String,
    /// Listen host for network transports
    pub host: String,
    /// Listen port for network transports
    pub port: u16,
    /// Tool segment stamped on composite keys
    pub tool_name: String,
    /// Deadline for a single tool call
    pub tool_timeout: Duration,
    /// Default for `set_node_attributes` when the caller omits the flag
    pub auto_create_attributes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mcp_mode: DEFAULT_MODE.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            tool_name: DEFAULT_TOOL_NAME.to_owned(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            auto_create_attributes: true,
        }
    }
}

impl ServerConfig {
    /// Apply a set of overrides on top of the defaults
    ///
    /// The tool name is normalized here; one that normalizes to an invalid
    /// key prefix is a configuration error.
    pub fn from_overrides(overrides: ConfigOverrides) -> Result<Self, UrlDbError> {
        let defaults = Self::default();
        let config = Self {
            mcp_mode: overrides.mcp_mode.unwrap_or(defaults.mcp_mode),
            host: overrides.host.unwrap_or(defaults.host),
            port: overrides.port.unwrap_or(defaults.port),
            tool_name: overrides.tool_name.unwrap_or(defaults.tool_name),
            tool_timeout: overrides
                .tool_timeout_secs
                .map_or(defaults.tool_timeout, Duration::from_secs),
            auto_create_attributes: overrides
                .auto_create_attributes
                .unwrap_or(defaults.auto_create_attributes),
        };
        Ok(Self {
            tool_name: config.normalized_tool_name()?,
            ..config
        })
    }

    /// Set the tool name
    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    /// The tool name as it appears in composite keys
    pub fn normalized_tool_name(&self) -> Result<String, UrlDbError> {
        normalize_tool_name(&self.tool_name).map_err(|e| {
            UrlDbError::config(format!("invalid tool name '{}': {e}", self.tool_name))
        })
    }
}

/// One configuration layer; `None` defers to the next layer down
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Transport mode
    pub mcp_mode: Option<String>,
    /// Listen host
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Tool name
    pub tool_name: Option<String>,
    /// Tool timeout in seconds
    pub tool_timeout_secs: Option<u64>,
    /// Attribute auto-creation default
    pub auto_create_attributes: Option<bool>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment
    ///
    /// Unparseable numeric or boolean values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            mcp_mode: non_empty(ENV_MODE),
            host: None,
            port: non_empty(ENV_PORT).and_then(|v| v.trim().parse().ok()),
            tool_name: non_empty(ENV_TOOL_NAME),
            tool_timeout_secs: non_empty(ENV_TOOL_TIMEOUT)
                .and_then(|v| parse_timeout(&v).ok())
                .map(|d| d.as_secs()),
            auto_create_attributes: non_empty(ENV_AUTO_CREATE_ATTRIBUTES)
                .and_then(|v| parse_bool_flag(&v)),
        }
    }

    /// Fill every unset field from `fallback`
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            mcp_mode: self.mcp_mode.or(fallback.mcp_mode),
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
            tool_name: self.tool_name.or(fallback.tool_name),
            tool_timeout_secs: self.tool_timeout_secs.or(fallback.tool_timeout_secs),
            auto_create_attributes: self
                .auto_create_attributes
                .or(fallback.auto_create_attributes),
        }
    }
}

/// Parse a timeout value from a string (in seconds)
pub fn parse_timeout(input: &str) -> Result<Duration, ParseIntError> {
    input.trim().parse::<u64>().map(Duration::from_secs)
}

/// Parse common boolean spellings (`true/false`, `1/0`, `yes/no`, `on/off`)
pub fn parse_bool_flag(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Default location of the TOML configuration file
#[cfg(feature = "config-file")]
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("url-db").join("config.toml"))
}

/// Load overrides from a TOML file
#[cfg(feature = "config-file")]
pub fn load_config_file(path: &std::path::Path) -> Result<ConfigOverrides, UrlDbError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| UrlDbError::config(format!("cannot read {}: {e}", path.display())))?;
    parse_config_toml(&raw)
}

/// Parse TOML configuration text
#[cfg(feature = "config-file")]
pub fn parse_config_toml(raw: &str) -> Result<ConfigOverrides, UrlDbError> {
    toml::from_str(raw).map_err(|e| UrlDbError::config(format!("invalid config file: {e}")))
}
