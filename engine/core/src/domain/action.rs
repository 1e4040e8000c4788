// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Action port (Anti-Corruption Layer for mitigation side effects).
//!
//! The engine never performs real I/O itself: candidate actions cross this
//! boundary, and the wired implementation decides what "execute" means
//! (webhooks in production, a logging interceptor everywhere else).
//! Implementations in infrastructure/actions.rs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::route::ShipmentId;

/// Mitigation actions the decision policy can choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Divert the shipment off the disrupted corridor.
    Reroute {
        shipment_id: ShipmentId,
        reason: String,
    },
    /// Notify the operator responsible for a shipment.
    Notify {
        shipment_id: ShipmentId,
        message: String,
    },
    /// Broadcast an alert for every party on the route.
    AlertBroadcast { message: String },
    /// Push a status change into the shipment system of record.
    StatusUpdate {
        shipment_id: ShipmentId,
        status: String,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Reroute { .. } => "reroute",
            Action::Notify { .. } => "notify",
            Action::AlertBroadcast { .. } => "alert_broadcast",
            Action::StatusUpdate { .. } => "status_update",
        }
    }
}

/// Errors surfaced by action dispatch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("Action timed out")]
    Timeout,

    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

/// Domain interface for executing actions.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn execute(&self, action: &Action) -> Result<(), ActionError>;
}
