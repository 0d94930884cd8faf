// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Content blocks and argument decoding shared by the handlers.
mod content;
/// Maps MCP calls onto the entity services.
mod handler;
/// Planning prompts.
pub mod prompts;
/// `contract-manager://` resources and completion.
pub mod resources;
/// Tool catalog and argument types.
pub mod tools;

pub use handler::{ContractManagerHandler, HandlerOptions};
pub use resources::{ResourceUri, URI_SCHEME};
