// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Connected MCP sessions.
//!
//! A [`Session`] is one client connection: its outbound line queue, the
//! capabilities it declared, the server-to-client requests waiting for an
//! answer, and the cancel flags of its in-flight tool calls. The
//! [`SessionHub`] tracks every live session so notifications can be routed
//! to them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::confirm::Prompter;
use crate::dispatch::SessionChannel;
use crate::mcp::types::{
    ClientCapabilities, ElicitRequestParams, Notification, ProgressParams, ProgressToken, Request,
    RequestId, Response,
};
use crate::progress::{CancelFlag, ProgressSink, ProgressUpdate};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

type Pending = HashMap<RequestId, oneshot::Sender<Response>>;

/// One client connection.
pub struct Session {
    id: SessionId,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    capabilities: RwLock<ClientCapabilities>,
    next_request_id: AtomicI64,
    pending: Mutex<Pending>,
    in_flight: Mutex<HashMap<RequestId, CancelFlag>>,
    closed: AtomicBool,
}

impl Session {
    /// Creates a session writing serialized lines to `outbound`.
    #[must_use]
    pub fn new(id: SessionId, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            outbound: Mutex::new(Some(outbound)),
            capabilities: RwLock::new(ClientCapabilities::default()),
            next_request_id: AtomicI64::new(1),
            pending: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The session identifier.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether [`Session::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<RequestId, CancelFlag>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues one JSON-RPC message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the message cannot be
    /// serialized.
    pub fn send<T: Serialize>(&self, message: &T) -> Result<()> {
        let line = serde_json::to_string(message).context("Failed to serialize message")?;
        trace!(session = %self.id, "Sending: {line}");
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = outbound.as_ref() else {
            bail!("session {} is closed", self.id);
        };
        tx.send(line)
            .map_err(|_| anyhow!("session {} writer has stopped", self.id))
    }

    /// Queues a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed.
    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.send(&Notification::new(method, params))
    }

    /// Sends a server-to-client request and waits up to `timeout` for its
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the session closes first, the timeout elapses, or
    /// the client answers with a JSON-RPC error.
    pub async fn request(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = RequestId::String(format!(
            "cm-{}",
            self.next_request_id.fetch_add(1, Ordering::SeqCst)
        ));
        let request = Request {
            jsonrpc: "2.0".to_string(),
            id: id.clone(),
            method: method.to_string(),
            params: Some(params),
        };

        let (tx, rx) = oneshot::channel();
        self.pending().insert(id.clone(), tx);

        if let Err(e) = self.send(&request) {
            self.pending().remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => bail!("session {} closed while waiting for '{method}'", self.id),
            Err(_) => {
                self.pending().remove(&id);
                bail!("'{method}' timed out after {timeout:?}");
            }
        };

        if let Some(error) = response.error {
            bail!("client error {}: {}", error.code, error.message);
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Routes a client response to the request waiting for it. Returns
    /// whether a waiter was found.
    pub fn resolve_response(&self, response: Response) -> bool {
        let Some(id) = response.id.clone() else {
            warn!(session = %self.id, "Response without id");
            return false;
        };
        match self.pending().remove(&id) {
            Some(sender) => sender.send(response).is_ok(),
            None => {
                warn!(session = %self.id, "Response for unknown request id: {id}");
                false
            }
        }
    }

    /// Records what the client declared in `initialize`.
    pub fn set_client_capabilities(&self, capabilities: ClientCapabilities) {
        *self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner) = capabilities;
    }

    /// Registers an in-flight call and returns its cancel flag.
    pub fn begin_call(&self, id: &RequestId) -> CancelFlag {
        let flag = CancelFlag::new();
        self.in_flight().insert(id.clone(), flag.clone());
        flag
    }

    /// Forgets an in-flight call.
    pub fn finish_call(&self, id: &RequestId) {
        self.in_flight().remove(id);
    }

    /// Raises the cancel flag of one in-flight call. Returns whether the
    /// call was known.
    pub fn cancel_call(&self, id: &RequestId) -> bool {
        match self.in_flight().get(id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    /// Raises every in-flight cancel flag.
    pub fn cancel_all(&self) {
        for flag in self.in_flight().values() {
            flag.cancel();
        }
    }

    /// Marks the session closed. Pending requests fail immediately and the
    /// writer stops once it has drained what was already queued.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = {
            let mut pending = self.pending();
            let count = pending.len();
            pending.clear();
            count
        };
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(session = %self.id, dropped, "Session closed");
    }
}

impl Prompter for Session {
    fn supports_elicitation(&self) -> bool {
        !self.is_closed()
            && self
                .capabilities
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .elicitation
                .is_some()
    }

    async fn elicit(&self, request: ElicitRequestParams, timeout: Duration) -> Result<Value> {
        let params = serde_json::to_value(request)?;
        self.request("elicitation/create", params, timeout).await
    }
}

impl ProgressSink for Session {
    fn emit(&self, token: &ProgressToken, update: ProgressUpdate) {
        let params = ProgressParams {
            progress_token: token.clone(),
            progress: update.progress,
            total: Some(update.total),
            message: Some(update.message),
        };
        let sent = serde_json::to_value(params)
            .map_err(anyhow::Error::from)
            .and_then(|params| self.notify("notifications/progress", Some(params)));
        if let Err(e) = sent {
            warn!(session = %self.id, "Progress notification dropped: {e:#}");
        }
    }
}

/// Every live session.
#[derive(Default)]
pub struct SessionHub {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session.
    pub fn connect(&self, session: Arc<Session>) {
        debug!(session = %session.id(), "Session connected");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().clone(), session);
    }

    /// Removes a session.
    pub fn disconnect(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            debug!(session = %id, "Session disconnected");
        }
        removed
    }

    /// Looks up a session.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionChannel for SessionHub {
    fn session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn send(&self, session: &SessionId, notification: &Notification) -> Result<()> {
        self.get(session)
            .with_context(|| format!("unknown session {session}"))?
            .send(notification)
    }
}
