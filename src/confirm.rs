// SPDX-License-Identifier: GPL-3.0-or-later

//! Confirmation round trip before destructive actions.
//!
//! Only sessions that declared the elicitation capability are asked. The
//! answer counts as positive only for `action: "accept"` with
//! `content.confirmed === true`; declines, malformed answers, timeouts and
//! channel failures all count as negative.

use std::future::Future;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::mcp::types::{ElicitAction, ElicitRequestParams, ElicitResult};

/// A peer that can be asked a question.
pub trait Prompter: Send + Sync {
    /// Whether the peer declared support for `elicitation/create`.
    fn supports_elicitation(&self) -> bool;

    /// Sends one elicitation and waits up to `timeout` for the raw result.
    fn elicit(
        &self,
        request: ElicitRequestParams,
        timeout: Duration,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;
}

/// Outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The user confirmed.
    Confirmed,
    /// The user declined, or the answer was unusable.
    Declined,
    /// The peer cannot be asked; proceed without confirmation.
    NotAsked,
}

impl Confirmation {
    /// Whether the guarded action may run.
    #[must_use]
    pub const fn proceeds(self) -> bool {
        !matches!(self, Self::Declined)
    }
}

/// Asks sessions to confirm destructive actions.
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    timeout: Duration,
}

impl ConfirmationGate {
    /// Creates a gate that waits at most `timeout` for an answer.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The schema sent with every confirmation request.
    #[must_use]
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "confirmed": {
                    "type": "boolean",
                    "title": "Confirm",
                    "description": "Set to true to go ahead with the action"
                }
            },
            "required": ["confirmed"]
        })
    }

    /// Asks `prompter` to confirm `message`.
    pub async fn confirm<P>(&self, prompter: &P, message: impl Into<String>) -> Confirmation
    where
        P: Prompter + ?Sized,
    {
        if !prompter.supports_elicitation() {
            return Confirmation::NotAsked;
        }

        let request = ElicitRequestParams {
            message: message.into(),
            requested_schema: Self::schema(),
        };
        match prompter.elicit(request, self.timeout).await {
            Ok(raw) if is_positive(&raw) => {
                debug!("Confirmation accepted");
                Confirmation::Confirmed
            }
            Ok(raw) => {
                debug!(response = %raw, "Confirmation declined");
                Confirmation::Declined
            }
            Err(e) => {
                info!("Confirmation failed, treating as declined: {e:#}");
                Confirmation::Declined
            }
        }
    }
}

/// Whether a raw `elicitation/create` result is a positive confirmation.
#[must_use]
pub fn is_positive(raw: &Value) -> bool {
    let Ok(result) = serde_json::from_value::<ElicitResult>(raw.clone()) else {
        return false;
    };
    result.action == ElicitAction::Accept
        && result
            .content
            .as_ref()
            .and_then(|content| content.get("confirmed"))
            == Some(&Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedPrompter {
        capable: bool,
        answer: Mutex<Option<anyhow::Result<Value>>>,
        asked: AtomicUsize,
    }

    impl ScriptedPrompter {
        fn answering(answer: anyhow::Result<Value>) -> Self {
            Self {
                capable: true,
                answer: Mutex::new(Some(answer)),
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn supports_elicitation(&self) -> bool {
            self.capable
        }

        async fn elicit(
            &self,
            request: ElicitRequestParams,
            _timeout: Duration,
        ) -> anyhow::Result<Value> {
            assert_eq!(request.requested_schema["required"], json!(["confirmed"]));
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?
                .take()
                .unwrap_or_else(|| Err(anyhow::anyhow!("asked twice")))
        }
    }

    fn gate() -> ConfirmationGate {
        ConfirmationGate::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_accept_with_true_confirms() {
        let prompter = ScriptedPrompter::answering(Ok(json!({
            "action": "accept",
            "content": {"confirmed": true}
        })));
        assert_eq!(gate().confirm(&prompter, "Delete?").await, Confirmation::Confirmed);
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_answers() {
        for answer in [
            json!({"action": "decline"}),
            json!({"action": "cancel"}),
            json!({"action": "accept", "content": {"confirmed": false}}),
            json!({"action": "accept", "content": {"confirmed": "true"}}),
            json!({"action": "accept", "content": {}}),
            json!({"action": "accept"}),
            json!({"unexpected": 1}),
            json!(null),
        ] {
            let prompter = ScriptedPrompter::answering(Ok(answer.clone()));
            let outcome = gate().confirm(&prompter, "Delete?").await;
            assert_eq!(
                outcome,
                Confirmation::Declined,
                "answer {answer} was not negative"
            );
            assert!(!outcome.proceeds());
        }
    }

    #[tokio::test]
    async fn test_channel_failure_fails_closed() {
        let prompter = ScriptedPrompter::answering(Err(anyhow::anyhow!("session closed")));
        assert_eq!(gate().confirm(&prompter, "Delete?").await, Confirmation::Declined);
    }

    #[tokio::test]
    async fn test_incapable_peer_is_not_asked() {
        let prompter = ScriptedPrompter {
            capable: false,
            answer: Mutex::new(None),
            asked: AtomicUsize::new(0),
        };
        let outcome = gate().confirm(&prompter, "Delete?").await;
        assert_eq!(outcome, Confirmation::NotAsked);
        assert!(outcome.proceeds());
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 0);
    }
}
