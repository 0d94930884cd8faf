// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Contract Manager is an MCP server over a small program, contract and task domain.
//!
//! Besides plain CRUD tools it exercises the parts of MCP that need server-side
//! state: resource subscriptions, list-changed notifications, tools that appear
//! and disappear with their data, elicitation-gated deletes and cancellable
//! progress.

/// Dynamic tool availability driven by collection emptiness.
pub mod availability;
/// MCP handler, tools, resources and prompts over the services.
pub mod bridge;
/// Helpers for the `stats` subcommand.
pub mod cli;
/// Configuration loading.
pub mod config;
/// Elicitation-backed confirmation of destructive actions.
pub mod confirm;
/// Fan-out of resource notifications to sessions.
pub mod dispatch;
/// Domain error taxonomy.
pub mod error;
/// Unix socket listener for concurrent sessions.
pub mod listener;
/// MCP server implementation and type definitions.
pub mod mcp;
/// Cancellable step runner with progress reporting.
pub mod progress;
/// Entity services with referential checks.
pub mod services;
/// Connected sessions and their outbound channels.
pub mod session;
/// SQLite persistence.
pub mod store;
/// Per-session resource subscriptions.
pub mod subscriptions;
