// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-session resource subscriptions.
//!
//! A pure relation store: URIs are opaque keys. Whether a URI may be
//! subscribed to is decided by the caller before [`SubscriptionRegistry::subscribe`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::session::SessionId;

/// Maps sessions to the resource URIs they follow.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_session: Mutex<HashMap<SessionId, HashSet<String>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, HashSet<String>>> {
        self.by_session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `(session, uri)`. Subscribing twice is a no-op.
    pub fn subscribe(&self, session: &SessionId, uri: &str) {
        let added = self
            .lock()
            .entry(session.clone())
            .or_default()
            .insert(uri.to_string());
        if added {
            debug!(session = %session, uri, "Subscribed");
        }
    }

    /// Removes `(session, uri)` if present, pruning the session's entry once
    /// it has no subscriptions left.
    pub fn unsubscribe(&self, session: &SessionId, uri: &str) {
        let mut map = self.lock();
        let Some(uris) = map.get_mut(session) else {
            return;
        };
        if uris.remove(uri) {
            debug!(session = %session, uri, "Unsubscribed");
        }
        if uris.is_empty() {
            map.remove(session);
        }
    }

    /// Sessions subscribed to `uri`, in no particular order.
    pub fn subscribers(&self, uri: &str) -> Vec<SessionId> {
        self.lock()
            .iter()
            .filter(|(_, uris)| uris.contains(uri))
            .map(|(session, _)| session.clone())
            .collect()
    }

    /// URIs a session is subscribed to, sorted.
    pub fn session_subscriptions(&self, session: &SessionId) -> Vec<String> {
        let mut uris: Vec<String> = self
            .lock()
            .get(session)
            .map(|uris| uris.iter().cloned().collect())
            .unwrap_or_default();
        uris.sort();
        uris
    }

    /// Drops every subscription of a session. Called on disconnect.
    pub fn clear_session(&self, session: &SessionId) {
        if let Some(uris) = self.lock().remove(session) {
            debug!(session = %session, count = uris.len(), "Cleared subscriptions");
        }
    }

    /// Total `(session, uri)` pairs.
    pub fn subscription_count(&self) -> usize {
        self.lock().values().map(HashSet::len).sum()
    }

    /// Whether the session has an entry at all.
    pub fn has_session(&self, session: &SessionId) -> bool {
        self.lock().contains_key(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = "contract-manager://tasks/T001";
    const TAG: &str = "contract-manager://tags/TAG001";

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn test_subscribe_unsubscribe_prunes_session() {
        let registry = SubscriptionRegistry::new();
        let s = sid("a");

        registry.subscribe(&s, TASK);
        assert_eq!(registry.subscribers(TASK), vec![s.clone()]);

        registry.unsubscribe(&s, TASK);
        assert!(registry.subscribers(TASK).is_empty());
        assert!(!registry.has_session(&s));
    }

    #[test]
    fn test_unsubscribe_keeps_other_subscriptions() {
        let registry = SubscriptionRegistry::new();
        let s = sid("a");
        registry.subscribe(&s, TASK);
        registry.subscribe(&s, TAG);

        registry.unsubscribe(&s, TASK);
        assert!(registry.has_session(&s));
        assert_eq!(registry.session_subscriptions(&s), vec![TAG.to_string()]);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let s = sid("a");
        registry.subscribe(&s, TASK);
        registry.subscribe(&s, TASK);
        assert_eq!(registry.subscribers(TASK).len(), 1);
        assert_eq!(registry.subscription_count(), 1);
    }

    #[test]
    fn test_unsubscribe_absent_is_noop() {
        let registry = SubscriptionRegistry::new();
        registry.unsubscribe(&sid("ghost"), TASK);
        registry.subscribe(&sid("a"), TAG);
        registry.unsubscribe(&sid("a"), TASK);
        assert_eq!(registry.subscription_count(), 1);
    }

    #[test]
    fn test_clear_session_removes_only_that_session() {
        let registry = SubscriptionRegistry::new();
        let (a, b) = (sid("a"), sid("b"));
        registry.subscribe(&a, TASK);
        registry.subscribe(&a, TAG);
        registry.subscribe(&b, TASK);
        assert_eq!(registry.subscription_count(), 3);

        registry.clear_session(&a);
        assert_eq!(registry.subscription_count(), 1);
        assert_eq!(registry.subscribers(TASK), vec![b]);
        assert!(registry.subscribers(TAG).is_empty());
    }

    #[test]
    fn test_registry_accepts_any_key() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(&sid("a"), "not a uri at all");
        assert_eq!(registry.subscribers("not a uri at all").len(), 1);
    }
}
