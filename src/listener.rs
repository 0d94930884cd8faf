// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Unix socket listener for multi-session serving.
//!
//! Each accepted connection becomes its own MCP session speaking the same
//! line-delimited JSON-RPC as stdio. All sessions share one handler, so a
//! mutation made by one client notifies the others.

use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::mcp::{McpHandler, McpServer};

/// Accepts MCP sessions on a Unix socket.
pub struct SessionListener<H: McpHandler> {
    server: Arc<McpServer<H>>,
}

impl<H: McpHandler> SessionListener<H> {
    /// Creates a listener that hands every connection to `server`.
    #[must_use]
    pub const fn new(server: Arc<McpServer<H>>) -> Self {
        Self { server }
    }

    /// Starts listening on `socket_path`.
    ///
    /// Spawns a background task that accepts connections and serves each on
    /// its own task. Returns the `JoinHandle` of the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn start(self, socket_path: &Path) -> Result<JoinHandle<()>> {
        // Remove stale socket file if it exists
        let _ = std::fs::remove_file(socket_path);

        let listener = UnixListener::bind(socket_path).map_err(|e| {
            anyhow!(
                "Failed to bind session socket {}: {e}",
                socket_path.display()
            )
        })?;

        info!("Session socket listening on {}", socket_path.display());

        let server = self.server;
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(&server, stream).await {
                                debug!("Session connection error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        warn!("Session socket accept error: {e}");
                    }
                }
            }
        });

        Ok(handle)
    }
}

async fn serve_connection<H: McpHandler>(server: &McpServer<H>, stream: UnixStream) -> Result<()> {
    let (reader, writer) = stream.into_split();
    debug!("Session connected");
    server.serve(reader, writer).await?;
    debug!("Session disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ContractManagerHandler, HandlerOptions};
    use crate::session::SessionHub;
    use crate::store::Store;
    use anyhow::Context;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::unix::OwnedReadHalf;

    async fn send(writer: &mut tokio::net::unix::OwnedWriteHalf, message: &Value) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn next(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Result<Value> {
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .context("timed out waiting for a message")??
            .context("connection closed")?;
        Ok(serde_json::from_str(&line)?)
    }

    #[tokio::test]
    async fn test_mutation_reaches_other_session() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let socket = dir.path().join("contract-manager.sock");

        let store = Arc::new(Store::open_in_memory()?);
        store.seed().await?;
        let hub = Arc::new(SessionHub::new());
        let handler =
            Arc::new(
                ContractManagerHandler::new(store, Arc::clone(&hub), HandlerOptions::default())
                    .await?,
            );
        let server = Arc::new(McpServer::new(handler, Arc::clone(&hub)));
        let accept = SessionListener::new(server).start(&socket)?;

        let (watcher_read, mut watcher_write) =
            UnixStream::connect(&socket).await?.into_split();
        let mut watcher = BufReader::new(watcher_read).lines();
        send(
            &mut watcher_write,
            &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
        )
        .await?;
        next(&mut watcher).await?;

        let (actor_read, mut actor_write) = UnixStream::connect(&socket).await?.into_split();
        let mut actor = BufReader::new(actor_read).lines();
        send(
            &mut actor_write,
            &json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": "create_tag", "arguments": {"name": "Shared"}}
            }),
        )
        .await?;
        let reply = loop {
            let message = next(&mut actor).await?;
            if message.get("id").is_some() {
                break message;
            }
        };
        assert!(reply["result"]["isError"].is_null());

        let heard = next(&mut watcher).await?;
        assert_eq!(heard["method"], "notifications/resources/list_changed");
        assert_eq!(hub.len(), 2);

        accept.abort();
        Ok(())
    }
}
