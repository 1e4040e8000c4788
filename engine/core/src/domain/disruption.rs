// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Disruptions, decisions, session states, and the audit record.
//!
//! A `DisruptionEvent` is derived exactly once from an `Event` that
//! intersects a route corridor and is consumed exactly once by that route's
//! decision session; a repeat occurrence is a new instance. Audit records
//! are append-only and never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::action::Action;
use super::event::{Event, EventId};
use super::route::{RouteId, ShipmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisruptionId(pub Uuid);

impl DisruptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DisruptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An event that intersects a monitored route's corridor, scored against the
/// shipments currently on that route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisruptionEvent {
    pub id: DisruptionId,
    pub event: Event,
    pub route_id: RouteId,
    pub shipment_ids: Vec<ShipmentId>,
    /// Highest risk score over the affected shipments, 0–100.
    pub risk_score: f64,
    pub detected_at: DateTime<Utc>,
}

impl DisruptionEvent {
    pub fn new(
        event: Event,
        route_id: RouteId,
        shipment_ids: Vec<ShipmentId>,
        risk_score: f64,
    ) -> Self {
        Self {
            id: DisruptionId::new(),
            event,
            route_id,
            shipment_ids,
            risk_score,
            detected_at: Utc::now(),
        }
    }

    /// Stable hash of the inputs that produced this disruption, carried in
    /// the audit record so a trail entry can be tied back to its exact input.
    pub fn input_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event.id.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.route_id.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.risk_score.to_bits().to_be_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// Decision engine session states. The cycle is fixed:
/// Observe → Retrieve → Analyze → Decide → Act → Log → Observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Observe,
    Retrieve,
    Analyze,
    Decide,
    Act,
    Log,
}

impl SessionState {
    /// The single legal successor of each state. The cycle's shape lives
    /// here so suppression and termination behavior are testable in
    /// isolation from the session runtime.
    pub fn next(self) -> SessionState {
        match self {
            SessionState::Observe => SessionState::Retrieve,
            SessionState::Retrieve => SessionState::Analyze,
            SessionState::Analyze => SessionState::Decide,
            SessionState::Decide => SessionState::Act,
            SessionState::Act => SessionState::Log,
            SessionState::Log => SessionState::Observe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Observe => "observe",
            SessionState::Retrieve => "retrieve",
            SessionState::Analyze => "analyze",
            SessionState::Decide => "decide",
            SessionState::Act => "act",
            SessionState::Log => "log",
        }
    }
}

/// Why the safety gate refused an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    LowConfidence,
    RateLimited,
}

/// The output of the DECIDE stage. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub disruption_event_id: DisruptionId,
    pub assessment: String,
    /// In [0, 1]. Below the confidence gate threshold no action executes.
    pub confidence: f64,
    /// `None` means "no action".
    pub chosen_action: Option<Action>,
}

/// Terminal outcome of one pass through the cycle, as recorded in the trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Action permitted and the dispatcher reported success.
    Executed,
    /// Action permitted but dispatch failed or timed out.
    Failed { reason: String },
    /// Safety gate refused the action.
    Blocked { reason: BlockReason },
    /// Arrived during cooldown; coalesced without re-analysis.
    Suppressed,
    /// The decision chose no action.
    NoAction,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Executed => "executed",
            AuditOutcome::Failed { .. } => "failed",
            AuditOutcome::Blocked { .. } => "blocked",
            AuditOutcome::Suppressed => "suppressed",
            AuditOutcome::NoAction => "no_action",
        }
    }
}

/// One immutable line of the audit trail. `sequence` is assigned by the sink
/// at append time and equals insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub sequence: u64,
    pub event_id: EventId,
    pub route_id: RouteId,
    pub input_hash: String,
    pub reasoning_trace: Vec<String>,
    /// `None` only for suppressed occurrences, which are not re-decided.
    pub decision: Option<Decision>,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        event_id: EventId,
        route_id: RouteId,
        input_hash: String,
        reasoning_trace: Vec<String>,
        decision: Option<Decision>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            sequence: 0,
            event_id,
            route_id,
            input_hash,
            reasoning_trace,
            decision,
            outcome,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventCategory, SourceKind};

    fn event() -> Event {
        Event {
            id: EventId("abc123".into()),
            source_kind: SourceKind::News,
            category: EventCategory::PortStrike,
            location: None,
            location_name: Some("Rotterdam".into()),
            summary: "Port strike at Rotterdam".into(),
            timestamp: Utc::now(),
            raw_severity: 7,
        }
    }

    #[test]
    fn test_cycle_returns_to_observe() {
        let mut state = SessionState::Observe;
        for _ in 0..6 {
            state = state.next();
        }
        assert_eq!(state, SessionState::Observe);
    }

    #[test]
    fn test_cycle_order() {
        assert_eq!(SessionState::Observe.next(), SessionState::Retrieve);
        assert_eq!(SessionState::Retrieve.next(), SessionState::Analyze);
        assert_eq!(SessionState::Analyze.next(), SessionState::Decide);
        assert_eq!(SessionState::Decide.next(), SessionState::Act);
        assert_eq!(SessionState::Act.next(), SessionState::Log);
        assert_eq!(SessionState::Log.next(), SessionState::Observe);
    }

    #[test]
    fn test_input_hash_is_stable_and_input_sensitive() {
        let route = RouteId::new();
        let d1 = DisruptionEvent::new(event(), route, vec![], 72.0);
        let d2 = DisruptionEvent::new(event(), route, vec![], 72.0);
        let d3 = DisruptionEvent::new(event(), route, vec![], 55.0);

        assert_eq!(d1.input_hash(), d2.input_hash());
        assert_ne!(d1.input_hash(), d3.input_hash());
    }
}
