// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// MCP server implementation over line-delimited JSON-RPC.
mod server;
/// MCP type definitions and JSON-RPC messages.
pub mod types;

pub use server::{CallContext, McpHandler, McpServer, negotiate_version};
pub use types::*;
