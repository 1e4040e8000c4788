// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod context_service;
pub mod pruner;

pub use context_service::{
    ContextQuery, ContextStore, EventSink, NoopEventSink, StandardContextStore, TrendReport,
};
pub use pruner::{ContextPruner, ContextPrunerConfig};
