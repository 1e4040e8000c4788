// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod action;
pub mod config;
pub mod disruption;
pub mod event;
pub mod events;
pub mod geo;
pub mod reasoning;
pub mod route;

pub use action::{Action, ActionDispatcher, ActionError};
pub use config::EngineConfig;
pub use disruption::{
    AuditOutcome, AuditRecord, BlockReason, Decision, DisruptionEvent, DisruptionId, SessionState,
};
pub use event::{Event, EventCategory, EventId, RawRecord, RejectReason, SourceKind};
pub use events::EngineEvent;
pub use geo::GeoPoint;
pub use reasoning::{Assessment, Recommendation, ReasoningError, ReasoningStrategy};
pub use route::{CargoProfile, Route, RouteId, Shipment, ShipmentId, ShipmentStatus};
