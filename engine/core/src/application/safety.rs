// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Safety Gate
//!
//! The last stop before any action is committed. Rules, checked in order:
//!
//! 1. `confidence < min_confidence` → `Blocked(LowConfidence)`
//! 2. per-session trailing-window rate limit exceeded → `Blocked(RateLimited)`
//! 3. otherwise `Permitted`
//!
//! The confidence check runs first and does not consume a rate-limit cell,
//! so low-confidence noise cannot starve a later high-confidence action.
//! Blocked actions are recorded upstream, never executed. The rate rule uses
//! a keyed limiter with burst capacity equal to the per-window maximum.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::domain::action::Action;
use crate::domain::config::SafetyConfig;
use crate::domain::disruption::BlockReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Permitted,
    Blocked(BlockReason),
}

pub struct SafetyGate {
    min_confidence: f64,
    limiter: governor::DefaultKeyedRateLimiter<String>,
}

impl SafetyGate {
    pub fn new(config: &SafetyConfig) -> Self {
        let max_actions =
            NonZeroU32::new(config.max_actions_per_window.max(1)).unwrap_or(NonZeroU32::MIN);

        // One cell replenishes every window/max, with burst capacity max:
        // at most `max` permits inside any trailing window.
        let replenish = Duration::from_secs_f64(
            config.rate_window.as_secs_f64() / f64::from(max_actions.get()),
        );
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_hour(max_actions))
            .allow_burst(max_actions);

        Self {
            min_confidence: config.min_confidence,
            limiter: RateLimiter::keyed(quota),
        }
    }

    pub fn authorize(&self, session_key: &str, action: &Action, confidence: f64) -> Authorization {
        if confidence < self.min_confidence {
            debug!(
                session_key,
                kind = action.kind(),
                confidence,
                "Action blocked: confidence below threshold"
            );
            return Authorization::Blocked(BlockReason::LowConfidence);
        }

        match self.limiter.check_key(&session_key.to_string()) {
            Ok(_) => Authorization::Permitted,
            Err(_) => {
                debug!(
                    session_key,
                    kind = action.kind(),
                    "Action blocked: rate limit exceeded"
                );
                Authorization::Blocked(BlockReason::RateLimited)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::ShipmentId;

    fn action() -> Action {
        Action::Notify {
            shipment_id: ShipmentId("SHP_1001".into()),
            message: "delay".into(),
        }
    }

    fn gate(max_per_window: u32) -> SafetyGate {
        SafetyGate::new(&SafetyConfig {
            min_confidence: 0.70,
            max_actions_per_window: max_per_window,
            rate_window: Duration::from_secs(3600),
        })
    }

    #[test]
    fn test_low_confidence_is_blocked() {
        let gate = gate(2);
        assert_eq!(
            gate.authorize("route-1", &action(), 0.55),
            Authorization::Blocked(BlockReason::LowConfidence)
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let gate = gate(2);
        assert_eq!(
            gate.authorize("route-1", &action(), 0.70),
            Authorization::Permitted
        );
        assert_eq!(
            gate.authorize("route-1", &action(), 0.699),
            Authorization::Blocked(BlockReason::LowConfidence)
        );
    }

    #[test]
    fn test_rate_limit_blocks_third_through_fifth() {
        let gate = gate(2);
        let mut results = Vec::new();
        for _ in 0..5 {
            results.push(gate.authorize("route-1", &action(), 0.9));
        }

        assert_eq!(results[0], Authorization::Permitted);
        assert_eq!(results[1], Authorization::Permitted);
        for blocked in &results[2..] {
            assert_eq!(*blocked, Authorization::Blocked(BlockReason::RateLimited));
        }
    }

    #[test]
    fn test_sessions_are_rate_limited_independently() {
        let gate = gate(1);
        assert_eq!(
            gate.authorize("route-1", &action(), 0.9),
            Authorization::Permitted
        );
        assert_eq!(
            gate.authorize("route-1", &action(), 0.9),
            Authorization::Blocked(BlockReason::RateLimited)
        );
        // A different session still has its full budget.
        assert_eq!(
            gate.authorize("route-2", &action(), 0.9),
            Authorization::Permitted
        );
    }

    #[test]
    fn test_low_confidence_does_not_consume_rate_budget() {
        let gate = gate(1);
        for _ in 0..10 {
            assert_eq!(
                gate.authorize("route-1", &action(), 0.1),
                Authorization::Blocked(BlockReason::LowConfidence)
            );
        }
        assert_eq!(
            gate.authorize("route-1", &action(), 0.9),
            Authorization::Permitted
        );
    }
}
