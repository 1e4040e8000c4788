// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Context Pruner - Background task for retention enforcement
//!
//! Staleness is modeled through the recency weight and the retention
//! horizon; this task only reclaims memory. Nothing on the query hot path
//! waits for it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::ContextStore;

/// Configuration for the context pruner
#[derive(Debug, Clone)]
pub struct ContextPrunerConfig {
    /// How often to run the pruner (in seconds)
    pub interval_seconds: u64,

    /// Whether pruning is enabled
    pub enabled: bool,
}

impl Default for ContextPrunerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 600, // Run every 10 minutes
            enabled: true,
        }
    }
}

/// Background task evicting entries past the retention horizon.
pub struct ContextPruner {
    store: Arc<dyn ContextStore>,
    config: ContextPrunerConfig,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl ContextPruner {
    pub fn new(store: Arc<dyn ContextStore>, config: ContextPrunerConfig) -> Self {
        Self {
            store,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the pruner background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Context pruner is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting context pruner background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running context pruner cycle");

                    match self.store.prune_expired().await {
                        Ok(pruned_count) => {
                            if pruned_count > 0 {
                                info!(pruned_count, "Context pruner cycle completed");
                            }
                        }
                        Err(e) => {
                            warn!("Context pruner cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Context pruner shutting down");
                    return;
                }
            }
        }
    }
}
