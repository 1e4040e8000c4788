// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Deterministic rule-based reasoning strategy.
//!
//! The always-available fallback: maps the precomputed risk score onto a
//! recommendation tier with fixed confidences, and phrases a short
//! assessment from the event and shipment at hand. Pure thresholds, no I/O,
//! so every branch is unit-testable.

use async_trait::async_trait;

use crate::domain::disruption::DisruptionEvent;
use crate::domain::reasoning::{Assessment, Recommendation, ReasoningError, ReasoningStrategy};
use crate::domain::route::Shipment;
use aegis_sentinel_context::ScoredEntry;

/// Risk above this is an immediate-mitigation situation.
const CRITICAL_RISK: f64 = 80.0;
/// Risk above this warrants alerting operators.
const WARNING_RISK: f64 = 50.0;

pub struct RuleBasedStrategy;

impl RuleBasedStrategy {
    pub fn new() -> Self {
        Self
    }

    fn tier(risk: f64) -> (Recommendation, f64) {
        if risk > CRITICAL_RISK {
            (Recommendation::Critical, 0.85)
        } else if risk > WARNING_RISK {
            (Recommendation::Warning, 0.80)
        } else {
            (Recommendation::Advisory, 0.75)
        }
    }
}

impl Default for RuleBasedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningStrategy for RuleBasedStrategy {
    async fn analyze(
        &self,
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> Result<Assessment, ReasoningError> {
        let (recommendation, confidence) = Self::tier(disruption.risk_score);

        let mut text = format!(
            "{} ({}) risk {:.0}/100 on route {}",
            disruption.event.summary,
            disruption.event.category.as_str(),
            disruption.risk_score,
            disruption.route_id,
        );
        if let Some(shipment) = shipment {
            if shipment.cargo.perishable {
                text.push_str(&format!(
                    "; shipment {} carries perishable cargo",
                    shipment.id
                ));
            }
        }
        if !context.is_empty() {
            text.push_str(&format!("; {} similar prior events in window", context.len()));
        }

        Ok(Assessment {
            text,
            confidence,
            recommendation,
            strategy: "rules".into(),
        })
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}
