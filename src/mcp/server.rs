/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! MCP server implementation.
//!
//! One [`McpServer::serve`] call drives one connection. Inbound requests
//! each run on their own task so a call that waits on the client (a delete
//! asking for confirmation, a long task) never blocks the connection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::types::*;
use crate::error::Error;
use crate::progress::CancelFlag;
use crate::session::{Session, SessionHub, SessionId};

/// What a tool call gets besides its arguments.
#[derive(Clone)]
pub struct CallContext {
    /// The calling session.
    pub session: Arc<Session>,
    /// Token for `notifications/progress`, if the caller sent one.
    pub progress_token: Option<ProgressToken>,
    /// Raised by `notifications/cancelled` or by disconnect.
    pub cancel: CancelFlag,
}

/// Server-side behaviour behind the MCP methods.
pub trait McpHandler: Send + Sync + 'static {
    /// Name and version reported by `initialize`.
    fn server_info(&self) -> ServerInfo;

    /// Free-form usage notes reported by `initialize`.
    fn instructions(&self) -> Option<String> {
        None
    }

    /// Currently enabled tools.
    fn list_tools(&self) -> Vec<Tool>;

    /// Runs one tool.
    fn call_tool(
        &self,
        name: String,
        arguments: Option<Value>,
        context: CallContext,
    ) -> impl Future<Output = crate::error::Result<CallToolResult>> + Send;

    /// Concrete resources.
    fn list_resources(&self) -> impl Future<Output = crate::error::Result<Vec<Resource>>> + Send;

    /// Resource templates.
    fn list_resource_templates(&self) -> Vec<ResourceTemplate>;

    /// Reads one resource.
    fn read_resource(
        &self,
        uri: String,
    ) -> impl Future<Output = crate::error::Result<ReadResourceResult>> + Send;

    /// Subscribes a session to a resource.
    fn subscribe(
        &self,
        session: SessionId,
        uri: String,
    ) -> impl Future<Output = crate::error::Result<()>> + Send;

    /// Drops one subscription.
    fn unsubscribe(&self, session: &SessionId, uri: &str);

    /// Available prompts.
    fn list_prompts(&self) -> Vec<Prompt>;

    /// Renders one prompt.
    fn get_prompt(
        &self,
        name: String,
        arguments: HashMap<String, String>,
    ) -> impl Future<Output = crate::error::Result<GetPromptResult>> + Send;

    /// Completes an argument value.
    fn complete(
        &self,
        params: CompleteParams,
    ) -> impl Future<Output = crate::error::Result<Completion>> + Send;

    /// Called once after a session disconnects.
    fn session_closed(&self, session: &SessionId);
}

/// MCP server over line-delimited JSON-RPC.
pub struct McpServer<H> {
    handler: Arc<H>,
    hub: Arc<SessionHub>,
}

impl<H: McpHandler> McpServer<H> {
    /// Creates a server. Sessions it accepts are registered in `hub`.
    pub const fn new(handler: Arc<H>, hub: Arc<SessionHub>) -> Self {
        Self { handler, hub }
    }

    /// Serves one session on stdin/stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if reading stdin fails.
    pub async fn run_stdio(&self) -> Result<()> {
        info!("MCP server starting, waiting for requests on stdin");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
        info!("MCP server shutting down (stdin closed)");
        Ok(())
    }

    /// Serves one session until `reader` reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the connection fails.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_handle = tokio::spawn(write_lines(writer, rx));

        let session = Arc::new(Session::new(SessionId::generate(), tx));
        self.hub.connect(Arc::clone(&session));

        let mut lines = BufReader::new(reader).lines();
        let outcome = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    trace!(session = %session.id(), "Received: {line}");
                    self.handle_line(&session, line);
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e).context("Failed to read from connection"),
            }
        };

        session.cancel_all();
        session.close();
        self.handler.session_closed(session.id());
        self.hub.disconnect(session.id());

        if let Err(e) = writer_handle.await {
            warn!("Writer task failed: {e}");
        }
        outcome
    }

    fn handle_line(&self, session: &Arc<Session>, line: &str) {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                reply(session, Response::error(None, PARSE_ERROR, format!("Parse error: {e}")));
                return;
            }
        };

        let has_method = value.get("method").is_some();
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        match (has_method, has_id) {
            (true, true) => match serde_json::from_value::<Request>(value) {
                Ok(request) => self.handle_request(session, request),
                Err(e) => reply(
                    session,
                    Response::error(None, INVALID_REQUEST, format!("Invalid request: {e}")),
                ),
            },
            (true, false) => match serde_json::from_value::<Notification>(value) {
                Ok(notification) => handle_notification(session, &notification),
                Err(e) => warn!("Malformed notification: {e}"),
            },
            (false, true) => match serde_json::from_value::<Response>(value) {
                Ok(response) => {
                    session.resolve_response(response);
                }
                Err(e) => warn!("Malformed response: {e}"),
            },
            (false, false) => reply(
                session,
                Response::error(None, INVALID_REQUEST, "Not a JSON-RPC message"),
            ),
        }
    }

    fn handle_request(&self, session: &Arc<Session>, request: Request) {
        debug!("Handling request: {} (id={})", request.method, request.id);

        // Answered inline so the capabilities are recorded before any later
        // request on the same connection runs.
        match request.method.as_str() {
            "initialize" => {
                let response = self.handle_initialize(session, request);
                reply(session, response);
                return;
            }
            "ping" => {
                reply(session, success(request.id, json!({})));
                return;
            }
            _ => {}
        }

        // Registered before the task starts, so a cancellation or a disconnect
        // right behind the request still reaches it.
        let cancel = session.begin_call(&request.id);
        let handler = Arc::clone(&self.handler);
        let session = Arc::clone(session);
        tokio::spawn(async move {
            let id = request.id.clone();
            let response = route(&*handler, &session, request, cancel).await;
            session.finish_call(&id);
            reply(&session, response);
        });
    }

    fn handle_initialize(&self, session: &Session, request: Request) -> Response {
        let params: InitializeParams = match parse_params(request.params) {
            Ok(params) => params,
            Err(e) => return Response::error(Some(request.id), INVALID_PARAMS, e.to_string()),
        };

        info!(
            "MCP client connecting: {} v{}",
            params.client_info.name,
            params.client_info.version.as_deref().unwrap_or("unknown")
        );
        let protocol_version = negotiate_version(&params.protocol_version);
        info!("Protocol version: {protocol_version}");
        if params.capabilities.elicitation.is_some() {
            debug!(session = %session.id(), "Client supports elicitation");
        }
        session.set_client_capabilities(params.capabilities);

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChangedCapability {
                    list_changed: Some(true),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(true),
                    list_changed: Some(true),
                }),
                prompts: Some(ListChangedCapability {
                    list_changed: Some(false),
                }),
                completions: Some(json!({})),
            },
            server_info: self.handler.server_info(),
            instructions: self.handler.instructions(),
        };
        success(request.id, result)
    }
}

/// The requested protocol revision if supported, the latest otherwise.
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            error!("Failed to write to connection: {e}");
            break;
        }
    }
}

fn reply(session: &Session, response: Response) {
    if let Err(e) = session.send(&response) {
        debug!(session = %session.id(), "Response dropped: {e:#}");
    }
}

fn success(id: RequestId, result: impl serde::Serialize) -> Response {
    match Response::success(id.clone(), result) {
        Ok(response) => response,
        Err(e) => Response::error(
            Some(id),
            INTERNAL_ERROR,
            format!("Failed to encode result: {e}"),
        ),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> crate::error::Result<T> {
    let params = params.ok_or_else(|| Error::Validation("missing params".to_string()))?;
    Ok(serde_json::from_value(params)?)
}

fn handle_notification(session: &Session, notification: &Notification) {
    debug!("Handling notification: {}", notification.method);

    match notification.method.as_str() {
        "notifications/initialized" => {
            info!(session = %session.id(), "MCP client initialized");
        }
        "notifications/cancelled" => {
            match parse_params::<CancelledParams>(notification.params.clone()) {
                Ok(params) => {
                    let known = session.cancel_call(&params.request_id);
                    debug!(
                        request = %params.request_id,
                        known,
                        reason = params.reason.as_deref().unwrap_or(""),
                        "Request cancelled"
                    );
                }
                Err(e) => warn!("Malformed cancellation: {e}"),
            }
        }
        _ => {
            debug!("Ignoring unknown notification: {}", notification.method);
        }
    }
}

/// Maps a handler error on a non-tool method to a JSON-RPC error.
fn method_error(id: RequestId, err: &Error) -> Response {
    let code = match err {
        Error::NotFound { .. }
        | Error::Validation(_)
        | Error::Unavailable(_)
        | Error::UnknownTool(_)
        | Error::UnknownResource(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    };
    Response::error(Some(id), code, err.to_string())
}

fn respond<T: serde::Serialize>(id: RequestId, result: crate::error::Result<T>) -> Response {
    match result {
        Ok(result) => success(id, result),
        Err(e) => {
            debug!("Request failed: {e}");
            method_error(id, &e)
        }
    }
}

async fn route<H: McpHandler>(
    handler: &H,
    session: &Arc<Session>,
    request: Request,
    cancel: CancelFlag,
) -> Response {
    let Request { id, method, params, .. } = request;

    match method.as_str() {
        "tools/list" => {
            let tools = handler.list_tools();
            debug!("Listing {} tools", tools.len());
            success(id, ListToolsResult { tools })
        }
        "tools/call" => {
            let params: CallToolParams = match parse_params(params) {
                Ok(params) => params,
                Err(e) => return Response::error(Some(id), INVALID_PARAMS, e.to_string()),
            };
            call_tool(handler, session, id, params, cancel).await
        }
        "resources/list" => respond(
            id,
            handler
                .list_resources()
                .await
                .map(|resources| ListResourcesResult { resources }),
        ),
        "resources/templates/list" => success(
            id,
            ListResourceTemplatesResult {
                resource_templates: handler.list_resource_templates(),
            },
        ),
        "resources/read" => match parse_params::<ResourceUriParams>(params) {
            Ok(params) => match handler.read_resource(params.uri).await {
                Err(e @ Error::NotFound { .. }) => {
                    Response::error(Some(id), RESOURCE_NOT_FOUND, e.to_string())
                }
                result => respond(id, result),
            },
            Err(e) => method_error(id, &e),
        },
        "resources/subscribe" => match parse_params::<ResourceUriParams>(params) {
            Ok(params) => {
                let result = handler.subscribe(session.id().clone(), params.uri).await;
                if result.is_ok() && session.is_closed() {
                    // The session ended while this was pending; its cleanup
                    // has already run.
                    handler.session_closed(session.id());
                }
                respond(id, result.map(|()| json!({})))
            }
            Err(e) => method_error(id, &e),
        },
        "resources/unsubscribe" => match parse_params::<ResourceUriParams>(params) {
            Ok(params) => {
                handler.unsubscribe(session.id(), &params.uri);
                success(id, json!({}))
            }
            Err(e) => method_error(id, &e),
        },
        "prompts/list" => success(
            id,
            ListPromptsResult {
                prompts: handler.list_prompts(),
            },
        ),
        "prompts/get" => match parse_params::<GetPromptParams>(params) {
            Ok(params) => respond(id, handler.get_prompt(params.name, params.arguments).await),
            Err(e) => method_error(id, &e),
        },
        "completion/complete" => match parse_params::<CompleteParams>(params) {
            Ok(params) => respond(
                id,
                handler
                    .complete(params)
                    .await
                    .map(|completion| CompleteResult { completion }),
            ),
            Err(e) => method_error(id, &e),
        },
        _ => {
            warn!("Unknown method: {method}");
            Response::error(Some(id), METHOD_NOT_FOUND, format!("Unknown method: {method}"))
        }
    }
}

async fn call_tool<H: McpHandler>(
    handler: &H,
    session: &Arc<Session>,
    id: RequestId,
    params: CallToolParams,
    cancel: CancelFlag,
) -> Response {
    debug!("Calling tool: {}", params.name);

    let context = CallContext {
        session: Arc::clone(session),
        progress_token: params.meta.and_then(|meta| meta.progress_token),
        cancel,
    };
    let name = params.name;
    let result = handler.call_tool(name.clone(), params.arguments, context).await;

    match result {
        Ok(result) => success(id, result),
        Err(e) if e.is_protocol_error() => {
            debug!("Tool call rejected: {e}");
            Response::error(Some(id), INVALID_PARAMS, e.to_string())
        }
        Err(e) => {
            error!("Tool call failed: {name}: {e}");
            success(id, CallToolResult::error(e.to_string()))
        }
    }
}
