// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Decision policy: maps an assessment to a candidate action, plus a ranked
//! list of suggestions that rides along in the audit trail.
//!
//! The chosen-action rules are fixed:
//! critical + perishable cargo → reroute; critical or warning → notify
//! (broadcast when no shipment is attributable); advisory → no action.
//! Suggestions are advisory output for operators: each carries its own
//! confidence and an auto-execute marker, ranked most confident first.

use serde::{Deserialize, Serialize};

use crate::domain::action::Action;
use crate::domain::disruption::DisruptionEvent;
use crate::domain::event::EventCategory;
use crate::domain::reasoning::{Assessment, Recommendation};
use crate::domain::route::Shipment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: Action,
    pub rationale: String,
    pub confidence: f64,
    pub auto_execute: bool,
}

/// The action the session will attempt, if any.
pub fn choose_action(
    assessment: &Assessment,
    disruption: &DisruptionEvent,
    shipment: Option<&Shipment>,
) -> Option<Action> {
    match (assessment.recommendation, shipment) {
        (Recommendation::Critical, Some(shipment)) if shipment.cargo.perishable => {
            Some(Action::Reroute {
                shipment_id: shipment.id.clone(),
                reason: assessment.text.clone(),
            })
        }
        (Recommendation::Critical | Recommendation::Warning, Some(shipment)) => {
            Some(Action::Notify {
                shipment_id: shipment.id.clone(),
                message: assessment.text.clone(),
            })
        }
        (Recommendation::Critical | Recommendation::Warning, None) => {
            Some(Action::AlertBroadcast {
                message: format!(
                    "{}: {}",
                    disruption.event.category.as_str(),
                    assessment.text
                ),
            })
        }
        (Recommendation::Advisory, _) => None,
    }
}

/// Ranked candidate actions for the reasoning trace, most confident first.
pub fn rank_suggestions(
    disruption: &DisruptionEvent,
    shipment: Option<&Shipment>,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let risk = disruption.risk_score;
    let location = disruption
        .event
        .location_name
        .clone()
        .unwrap_or_else(|| "the affected corridor".to_string());

    let shipment_id = shipment.map(|s| s.id.clone());

    if risk > 80.0 {
        if let Some(id) = &shipment_id {
            suggestions.push(Suggestion {
                action: Action::Reroute {
                    shipment_id: id.clone(),
                    reason: format!("Immediately reroute shipments passing through {location}"),
                },
                rationale: format!("Risk {risk:.0}/100 warrants immediate diversion"),
                confidence: 0.95,
                auto_execute: true,
            });
        }
        suggestions.push(Suggestion {
            action: Action::AlertBroadcast {
                message: format!("Emergency: high-risk disruption near {location}"),
            },
            rationale: "All affected parties should be informed".into(),
            confidence: 0.92,
            auto_execute: true,
        });
    }

    if risk > 50.0 {
        if let Some(id) = &shipment_id {
            suggestions.push(Suggestion {
                action: Action::StatusUpdate {
                    shipment_id: id.clone(),
                    status: "expedite".into(),
                },
                rationale: "Expedite time-sensitive and perishable cargo".into(),
                confidence: 0.85,
                auto_execute: false,
            });
            suggestions.push(Suggestion {
                action: Action::Notify {
                    shipment_id: id.clone(),
                    message: "Pre-book alternative transport routes".into(),
                },
                rationale: "Alternatives fill up fast during regional disruptions".into(),
                confidence: 0.78,
                auto_execute: false,
            });
        }
    }

    match disruption.event.category {
        EventCategory::CanalBlockage => {
            if let Some(id) = &shipment_id {
                suggestions.push(Suggestion {
                    action: Action::Reroute {
                        shipment_id: id.clone(),
                        reason: "Switch to the long way around the blocked passage".into(),
                    },
                    rationale: "Blockages of this kind historically persist for days".into(),
                    confidence: 0.88,
                    auto_execute: risk > 85.0,
                });
            }
        }
        EventCategory::PortStrike => {
            if let Some(id) = &shipment_id {
                suggestions.push(Suggestion {
                    action: Action::Reroute {
                        shipment_id: id.clone(),
                        reason: "Redirect to the nearest operational port".into(),
                    },
                    rationale: "Strike duration is uncertain".into(),
                    confidence: 0.82,
                    auto_execute: false,
                });
            }
        }
        EventCategory::TradeTariff => {
            if let Some(id) = &shipment_id {
                suggestions.push(Suggestion {
                    action: Action::StatusUpdate {
                        shipment_id: id.clone(),
                        status: "pre_clear_customs".into(),
                    },
                    rationale: "Pre-cleared documentation minimizes dwell time".into(),
                    confidence: 0.75,
                    auto_execute: false,
                });
            }
        }
        _ => {}
    }

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions.truncate(5);
    suggestions
}
