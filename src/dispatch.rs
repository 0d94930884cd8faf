// SPDX-License-Identifier: GPL-3.0-or-later

//! Out-of-band notifications to connected sessions.
//!
//! Sends are fire-and-forget. A failed send is logged and counted in the
//! returned [`Delivery`]; it never reaches the mutation that triggered it.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::mcp::types::Notification;
use crate::session::SessionId;
use crate::store::Collection;
use crate::subscriptions::SubscriptionRegistry;

/// Method of the broadcast resource-list signal.
pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
/// Method of the targeted resource signal.
pub const RESOURCE_UPDATED: &str = "notifications/resources/updated";
/// Method of the broadcast tool-list signal.
pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

/// Addressable sessions.
pub trait SessionChannel: Send + Sync {
    /// Every connected session.
    fn session_ids(&self) -> Vec<SessionId>;

    /// Queues `notification` for one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or its channel is closed.
    fn send(&self, session: &SessionId, notification: &Notification) -> anyhow::Result<()>;
}

/// Result of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Sends attempted.
    pub attempted: usize,
    /// Sends that failed.
    pub failed: usize,
}

/// Routes notifications to sessions.
#[derive(Clone)]
pub struct NotificationDispatcher {
    subscriptions: Arc<SubscriptionRegistry>,
    channel: Arc<dyn SessionChannel>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over a registry and a channel.
    pub fn new(subscriptions: Arc<SubscriptionRegistry>, channel: Arc<dyn SessionChannel>) -> Self {
        Self {
            subscriptions,
            channel,
        }
    }

    /// Tells every session that `collection`'s listing may have changed.
    pub fn resources_list_changed(&self, collection: Collection) -> Delivery {
        debug!(collection = %collection, "Broadcasting resource list change");
        let notification = Notification::new(RESOURCES_LIST_CHANGED, None);
        self.deliver(self.channel.session_ids(), &notification)
    }

    /// Tells every session that the set of enabled tools changed.
    pub fn tools_list_changed(&self) -> Delivery {
        let notification = Notification::new(TOOLS_LIST_CHANGED, None);
        self.deliver(self.channel.session_ids(), &notification)
    }

    /// Tells the subscribers of `uri` that it changed. No subscribers, no sends.
    pub fn resource_updated(&self, uri: &str) -> Delivery {
        let subscribers = self.subscriptions.subscribers(uri);
        if subscribers.is_empty() {
            return Delivery::default();
        }
        debug!(uri, subscribers = subscribers.len(), "Notifying subscribers");
        let notification = Notification::new(RESOURCE_UPDATED, Some(json!({ "uri": uri })));
        self.deliver(subscribers, &notification)
    }

    fn deliver(&self, targets: Vec<SessionId>, notification: &Notification) -> Delivery {
        let mut delivery = Delivery::default();
        for session in targets {
            delivery.attempted += 1;
            if let Err(e) = self.channel.send(&session, notification) {
                delivery.failed += 1;
                warn!(
                    session = %session,
                    method = %notification.method,
                    "Notification not delivered: {e:#}"
                );
            }
        }
        delivery
    }
}
