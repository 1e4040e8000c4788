// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the Context bounded context.
//! Published to the engine's telemetry bus for observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::EntryId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextEvent {
    /// An entry was embedded and became queryable
    EntryIndexed {
        entry_id: EntryId,
        route_scope: Option<String>,
        category: String,
        timestamp: DateTime<Utc>,
    },

    /// Expired entries were removed by the pruner
    EntriesPruned {
        pruned_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl ContextEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ContextEvent::EntryIndexed { timestamp, .. } => *timestamp,
            ContextEvent::EntriesPruned { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ContextEvent::EntryIndexed { .. } => "entry_indexed",
            ContextEvent::EntriesPruned { .. } => "entries_pruned",
        }
    }
}
