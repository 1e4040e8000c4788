// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Reasoning strategy implementations and the fallback router.
//
// Strategy selection happens once, at construction time, from configuration
// and credential availability, never by runtime type inspection. The router
// itself satisfies the strategy contract so the session holds exactly one
// `Arc<dyn ReasoningStrategy>` either way.

pub mod llm;
pub mod rules;

pub use llm::LlmStrategy;
pub use rules::RuleBasedStrategy;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::config::{resolve_secret, ConfigError, ReasoningConfig, ReasoningProvider};
use crate::domain::disruption::DisruptionEvent;
use crate::domain::reasoning::{Assessment, ReasoningError, ReasoningStrategy};
use crate::domain::route::Shipment;
use aegis_sentinel_context::ScoredEntry;

/// Primary strategy with a deterministic fallback. A failing backend never
/// aborts the session: the fallback answers instead.
pub struct StrategyRouter {
    primary: Arc<dyn ReasoningStrategy>,
    fallback: Option<Arc<dyn ReasoningStrategy>>,
}

impl StrategyRouter {
    pub fn new(
        primary: Arc<dyn ReasoningStrategy>,
        fallback: Option<Arc<dyn ReasoningStrategy>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Build from configuration. The LLM strategy is selected only when
    /// configured *and* its credentials resolve; otherwise the rule-based
    /// strategy runs alone.
    pub fn from_config(config: &ReasoningConfig) -> Result<Self, ConfigError> {
        match config.provider {
            ReasoningProvider::Llm => {
                let api_key = resolve_secret(&config.api_key)?.unwrap_or_default();
                let llm = Arc::new(LlmStrategy::new(
                    config.endpoint.clone(),
                    api_key,
                    config.model.clone(),
                    config.request_timeout,
                ));
                Ok(Self::new(llm, Some(Arc::new(RuleBasedStrategy::new()))))
            }
            ReasoningProvider::Rules => {
                Ok(Self::new(Arc::new(RuleBasedStrategy::new()), None))
            }
        }
    }
}

#[async_trait]
impl ReasoningStrategy for StrategyRouter {
    async fn analyze(
        &self,
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> Result<Assessment, ReasoningError> {
        match self.primary.analyze(disruption, shipment, context).await {
            Ok(assessment) => Ok(assessment),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        primary = self.primary.name(),
                        fallback = fallback.name(),
                        "Reasoning strategy failed, falling back: {}",
                        e
                    );
                    fallback.analyze(disruption, shipment, context).await
                }
                None => Err(e),
            },
        }
    }

    fn name(&self) -> &'static str {
        "router"
    }
}
