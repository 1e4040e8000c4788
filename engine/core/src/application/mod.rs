// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod engine;
pub mod metrics;
pub mod normalizer;
pub mod policy;
pub mod risk;
pub mod safety;
pub mod session;

pub use engine::{EngineDeps, EngineError, IngestOutcome, SentinelEngine};
pub use metrics::{DetectionMetrics, MetricsSnapshot};
pub use normalizer::{EventNormalizer, RejectCounts};
pub use policy::{choose_action, rank_suggestions, Suggestion};
pub use safety::{Authorization, SafetyGate};
pub use session::{run_session, DecisionSession, SessionDeps};
