// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reasoning strategy port (Anti-Corruption Layer).
//!
//! The ANALYZE stage talks to whichever strategy was selected at
//! construction time (an LLM-backed adapter when credentials are
//! configured, the deterministic rule-based strategy otherwise) through
//! this one contract. Implementations in infrastructure/strategies/.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::disruption::DisruptionEvent;
use super::route::Shipment;
use aegis_sentinel_context::ScoredEntry;

/// Qualitative recommendation tier, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Proceed with caution; monitoring only.
    Advisory,
    /// Operators should be alerted.
    Warning,
    /// Immediate mitigation required.
    Critical,
}

impl Recommendation {
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim().to_uppercase();
        if t.starts_with("CRITICAL") {
            Some(Self::Critical)
        } else if t.starts_with("WARNING") {
            Some(Self::Warning)
        } else if t.starts_with("ADVISORY") {
            Some(Self::Advisory)
        } else {
            None
        }
    }
}

/// What a strategy concludes about a disruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Short free-text impact analysis.
    pub text: String,
    /// In [0, 1]; gates action execution downstream.
    pub confidence: f64,
    pub recommendation: Recommendation,
    /// Which strategy produced this (for the reasoning trace).
    pub strategy: String,
}

/// Errors that can occur during analysis.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Unparseable strategy response: {0}")]
    InvalidResponse(String),
}

/// Domain interface for reasoning strategies.
#[async_trait]
pub trait ReasoningStrategy: Send + Sync {
    /// Analyze a disruption against the most impacted shipment, grounded in
    /// retrieved context.
    async fn analyze(
        &self,
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> Result<Assessment, ReasoningError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_parsing() {
        assert_eq!(
            Recommendation::parse("CRITICAL: REROUTE REQUIRED"),
            Some(Recommendation::Critical)
        );
        assert_eq!(
            Recommendation::parse("warning: alert issued"),
            Some(Recommendation::Warning)
        );
        assert_eq!(
            Recommendation::parse("Advisory: proceed with caution"),
            Some(Recommendation::Advisory)
        );
        assert_eq!(Recommendation::parse("shrug"), None);
    }

    #[test]
    fn test_recommendation_ordering() {
        assert!(Recommendation::Critical > Recommendation::Warning);
        assert!(Recommendation::Warning > Recommendation::Advisory);
    }
}
