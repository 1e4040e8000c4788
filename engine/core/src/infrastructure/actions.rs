// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Action dispatcher implementations.
//!
//! `WebhookDispatcher` is the production path: one POST per action to the
//! configured operations webhook. `LoggingDispatcher` satisfies the same
//! contract for every non-production configuration and never performs I/O.
//! Timeouts and retry bounds are enforced by the session around the
//! dispatch call, not inside it.

use async_trait::async_trait;
use tracing::info;

use crate::domain::action::{Action, ActionDispatcher, ActionError};

/// Posts each action as JSON to an operations webhook.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookDispatcher {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl ActionDispatcher for WebhookDispatcher {
    async fn execute(&self, action: &Action) -> Result<(), ActionError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(action)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ActionError::Timeout
                } else {
                    ActionError::Dispatch(e.to_string())
                }
            })?;

        if response.status().is_success() {
            info!(kind = action.kind(), "Action dispatched");
            Ok(())
        } else {
            Err(ActionError::Dispatch(format!(
                "Webhook returned HTTP {}",
                response.status()
            )))
        }
    }
}

/// Logging interceptor: records what would have happened, touches nothing.
#[derive(Default)]
pub struct LoggingDispatcher {
    executed: parking_lot::Mutex<Vec<Action>>,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions "executed" so far, for assertions in tests and dry runs.
    pub fn executed(&self) -> Vec<Action> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl ActionDispatcher for LoggingDispatcher {
    async fn execute(&self, action: &Action) -> Result<(), ActionError> {
        info!(kind = action.kind(), "DRY-RUN action: {:?}", action);
        self.executed.lock().push(action.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::ShipmentId;

    #[tokio::test]
    async fn test_logging_dispatcher_records_without_io() {
        let dispatcher = LoggingDispatcher::new();
        let action = Action::Notify {
            shipment_id: ShipmentId("SHP_1001".into()),
            message: "delay expected".into(),
        };

        dispatcher.execute(&action).await.unwrap();

        let executed = dispatcher.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].kind(), "notify");
    }
}
