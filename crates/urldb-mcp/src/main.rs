// ABOUTME: CLI entry point for the url-db MCP server binary
// ABOUTME: Layers CLI flags, environment, and config file, then serves over the selected transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use urldb::config::ConfigOverrides;
use urldb::{MemoryStore, ServerConfig, UrlDbError};

use urldb_mcp::server::McpServer;
use urldb_mcp::transport::create_transport;

/// Environment variable selecting the log filter
const LOG_ENV: &str = "LOG_LEVEL";

/// urldb-mcp: MCP server for organizing URLs into domains with attributes, dependencies, and templates
#[derive(Parser)]
#[command(name = "urldb-mcp", version, about)]
struct Cli {
    /// Transport mode: stdio, http, or sse
    #[arg(long)]
    mcp_mode: Option<String>,

    /// Listen port for http and sse
    #[arg(long)]
    port: Option<u16>,

    /// Listen host for http and sse
    #[arg(long)]
    host: Option<String>,

    /// Tool segment of composite keys
    #[arg(long)]
    tool_name: Option<String>,

    /// Per-call tool timeout in seconds
    #[arg(long)]
    tool_timeout: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mcp_mode: self.mcp_mode.clone(),
            host: self.host.clone(),
            port: self.port,
            tool_name: self.tool_name.clone(),
            tool_timeout_secs: self.tool_timeout,
            auto_create_attributes: None,
        }
    }
}

/// Overrides from the config file, if one is given or exists at the default location
#[cfg(feature = "config-file")]
fn file_overrides(explicit: Option<&std::path::Path>) -> Result<ConfigOverrides, UrlDbError> {
    if let Some(path) = explicit {
        return urldb::config::load_config_file(path);
    }
    match urldb::config::default_config_path() {
        Some(path) if path.exists() => urldb::config::load_config_file(&path),
        _ => Ok(ConfigOverrides::default()),
    }
}

#[cfg(not(feature = "config-file"))]
fn file_overrides(explicit: Option<&std::path::Path>) -> Result<ConfigOverrides, UrlDbError> {
    match explicit {
        Some(path) => Err(UrlDbError::config(format!(
            "cannot load {}: built without the config-file feature",
            path.display()
        ))),
        None => Ok(ConfigOverrides::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr to keep stdout clean for the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV)
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let overrides = cli
        .overrides()
        .or(ConfigOverrides::from_env())
        .or(file_overrides(cli.config.as_deref())?);
    let config = ServerConfig::from_overrides(overrides)?;

    let mut transport = create_transport(&config)?;
    let server = McpServer::from_config(Arc::new(MemoryStore::new()), &config)?;
    transport.set_request_handler(Arc::new(server));

    info!(
        mode = %transport.name(),
        tool_name = %config.tool_name,
        timeout = ?config.tool_timeout,
        "Starting url-db MCP server"
    );

    let transport: Arc<dyn urldb_mcp::transport::McpTransport> = Arc::from(transport);
    let signal_target = Arc::clone(&transport);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping transport");
            signal_target.stop();
        }
    });

    transport.start().await?;
    Ok(())
}
