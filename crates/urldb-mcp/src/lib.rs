// ABOUTME: Library root of the url-db MCP server exposing protocol, dispatcher, tools, and transports
// ABOUTME: Lets the binary and the integration tests share one implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod protocol;
pub mod server;
pub mod state;
pub mod tools;
pub mod transport;
