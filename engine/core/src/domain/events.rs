// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Engine lifecycle events published to the telemetry bus.
//! Delivery is best-effort observability; nothing in the decision path
//! depends on these being received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::disruption::SessionState;
use super::event::EventId;
use super::route::{RouteId, ShipmentId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A route was activated for monitoring
    RouteActivated {
        route_id: RouteId,
        waypoint_count: usize,
        corridor_radius_km: f64,
        timestamp: DateTime<Utc>,
    },

    /// Monitoring was stopped and the session torn down
    RouteDeactivated {
        route_id: RouteId,
        timestamp: DateTime<Utc>,
    },

    /// An event intersected a corridor and was queued for a session
    DisruptionDetected {
        route_id: RouteId,
        event_id: EventId,
        risk_score: f64,
        shipment_ids: Vec<ShipmentId>,
        timestamp: DateTime<Utc>,
    },

    /// A session moved between states of the decision cycle
    SessionTransition {
        route_id: RouteId,
        event_id: Option<EventId>,
        from: SessionState,
        to: SessionState,
        timestamp: DateTime<Utc>,
    },

    /// The DECIDE stage produced a decision
    DecisionMade {
        route_id: RouteId,
        event_id: EventId,
        confidence: f64,
        action: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Terminal outcome of one pass through the cycle
    OutcomeRecorded {
        route_id: RouteId,
        event_id: EventId,
        outcome: String,
        audit_sequence: u64,
        timestamp: DateTime<Utc>,
    },

    /// A disruption arrived during cooldown and was coalesced
    DisruptionSuppressed {
        route_id: RouteId,
        event_id: EventId,
        cooldown_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EngineEvent::RouteActivated { timestamp, .. } => *timestamp,
            EngineEvent::RouteDeactivated { timestamp, .. } => *timestamp,
            EngineEvent::DisruptionDetected { timestamp, .. } => *timestamp,
            EngineEvent::SessionTransition { timestamp, .. } => *timestamp,
            EngineEvent::DecisionMade { timestamp, .. } => *timestamp,
            EngineEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
            EngineEvent::DisruptionSuppressed { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::RouteActivated { .. } => "route_activated",
            EngineEvent::RouteDeactivated { .. } => "route_deactivated",
            EngineEvent::DisruptionDetected { .. } => "disruption_detected",
            EngineEvent::SessionTransition { .. } => "session_transition",
            EngineEvent::DecisionMade { .. } => "decision_made",
            EngineEvent::OutcomeRecorded { .. } => "outcome_recorded",
            EngineEvent::DisruptionSuppressed { .. } => "disruption_suppressed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_round_trip() {
        let event = EngineEvent::SessionTransition {
            route_id: RouteId::new(),
            event_id: None,
            from: SessionState::Observe,
            to: SessionState::Retrieve,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.event_type(), deserialized.event_type());
        assert!(json.contains("\"session_transition\""));
    }
}
