// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod actions;
pub mod audit;
pub mod corridor;
pub mod routing;
pub mod strategies;
pub mod telemetry;

pub use actions::{LoggingDispatcher, WebhookDispatcher};
pub use audit::{AuditError, AuditSink, InMemoryAuditSink, JsonlAuditSink};
pub use corridor::{CorridorError, CorridorIndex};
pub use strategies::{LlmStrategy, RuleBasedStrategy, StrategyRouter};
pub use routing::{GreatCirclePlanner, OsrmRoutePlanner, RoutePlanError, RoutePlanner};
pub use telemetry::{TelemetryBus, TelemetryError, TelemetryForwarder, TelemetryReceiver};
