// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AEGIS Sentinel Core
//!
//! Disruption Detection & Autonomous Decision Engine: normalizes streaming
//! real-world events, tests them against monitored route corridors, scores
//! risk, retrieves historical context, and drives a per-route decision state
//! machine whose actions are gated by confidence and rate-limit safety rules
//! and recorded in an append-only audit trail.
//!
//! # Architecture
//!
//! - **Layer:** Decision & Safety Layer
//! - **Purpose:** Event-driven disruption handling for active shipments

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;

/// Install the default tracing subscriber for binaries and test harnesses
/// embedding the engine. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
