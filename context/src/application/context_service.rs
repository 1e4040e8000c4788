// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # ContextStore — Living Index over Streaming Events
//!
//! Application service for the RETRIEVE stage. Insert and query interleave
//! freely against the shared repository; there is no rebuild phase. A query
//! never observes a partially inserted entry (the repository guarantees
//! atomic insert visibility), and a fresh query always recomputes its
//! ranking from current state.
//!
//! ## Ranking
//!
//! Results are ordered by `combined_score`: cosine similarity to the anchor
//! text, down-weighted by an exponential recency decay over the query's time
//! window. Entries older than the retention horizon are logically expired:
//! excluded from every result set and physically removed by the
//! [`ContextPruner`](crate::application::pruner::ContextPruner) off the hot
//! path.

use std::sync::Arc;

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{combined_score, ContextEvent, EntryId, NewEntry, ScoredEntry};
use crate::infrastructure::{Embedder, EntryFilter, EntryRepository};

/// Event bus trait for publishing domain events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: ContextEvent) -> Result<()>;
}

/// Sink that drops everything; used when no telemetry bus is attached.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: ContextEvent) -> Result<()> {
        Ok(())
    }
}

/// Parameters for a retrieval query.
#[derive(Debug, Clone)]
pub struct ContextQuery {
    /// Free text the results should be semantically close to.
    pub anchor: String,
    /// Route the retrieval is scoped to, if any.
    pub route_scope: Option<String>,
    /// How far back the query looks; also parameterizes the recency decay.
    pub time_window: Duration,
    pub limit: usize,
}

/// Frequency analysis over the live window.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrendReport {
    pub total_entries: usize,
    /// Locations ranked by event count, most frequent first (top 5).
    pub hotspots: Vec<(String, usize)>,
    pub by_category: HashMap<String, usize>,
    /// Locations with at least `recurrence_threshold` occurrences.
    pub recurring_locations: Vec<String>,
}

/// ContextStore interface
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Embed and insert; the entry is queryable when this returns.
    async fn index(&self, entry: NewEntry) -> Result<EntryId>;

    /// Similarity+recency ranked retrieval, most relevant first.
    async fn query(&self, query: ContextQuery) -> Result<Vec<ScoredEntry>>;

    /// Frequency analysis over entries inside the trend window.
    async fn trends(&self) -> Result<TrendReport>;

    /// Remove entries past the retention horizon. Returns the count.
    async fn prune_expired(&self) -> Result<usize>;
}

/// Standard implementation of ContextStore
pub struct StandardContextStore {
    repo: Arc<dyn EntryRepository>,
    embedder: Arc<dyn Embedder>,
    event_sink: Arc<dyn EventSink>,
    /// Entries older than this never appear in results.
    retention_horizon: Duration,
    /// Window used by `trends`.
    trend_window: Duration,
    recurrence_threshold: usize,
}

impl StandardContextStore {
    pub fn new(
        repo: Arc<dyn EntryRepository>,
        embedder: Arc<dyn Embedder>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            repo,
            embedder,
            event_sink,
            retention_horizon: Duration::days(7),
            trend_window: Duration::hours(24),
            recurrence_threshold: 3,
        }
    }

    pub fn with_retention_horizon(mut self, horizon: Duration) -> Self {
        self.retention_horizon = horizon;
        self
    }

    pub fn with_trend_window(mut self, window: Duration) -> Self {
        self.trend_window = window;
        self
    }

    pub fn with_recurrence_threshold(mut self, threshold: usize) -> Self {
        self.recurrence_threshold = threshold;
        self
    }

    fn horizon_cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.retention_horizon
    }
}

#[async_trait]
impl ContextStore for StandardContextStore {
    async fn index(&self, entry: NewEntry) -> Result<EntryId> {
        let embedding = self.embedder.embed(&entry.text).await?;
        let stored = crate::domain::ContextEntry::from_new(entry);
        let route_scope = stored.route_scope.clone();
        let category = stored.category.clone();

        let id = self.repo.insert(stored, embedding).await?;

        self.event_sink
            .publish(ContextEvent::EntryIndexed {
                entry_id: id,
                route_scope,
                category,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(id)
    }

    async fn query(&self, query: ContextQuery) -> Result<Vec<ScoredEntry>> {
        let anchor_embedding = self.embedder.embed(&query.anchor).await?;

        // The window never reaches past the retention horizon.
        let window_cutoff = Utc::now() - query.time_window;
        let occurred_after = window_cutoff.max(self.horizon_cutoff());

        let filter = EntryFilter {
            route_scope: query.route_scope.clone(),
            occurred_after,
        };

        // Overfetch so the recency re-rank has candidates to demote.
        let candidates = self
            .repo
            .search_similar(&anchor_embedding, &filter, query.limit * 5)
            .await?;

        let now = Utc::now();
        let mut scored: Vec<ScoredEntry> = candidates
            .into_iter()
            .map(|(entry, similarity)| {
                let age = now - entry.occurred_at;
                let score = combined_score(similarity, age, query.time_window);
                ScoredEntry {
                    entry,
                    similarity,
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.limit);

        debug!(
            results = scored.len(),
            route_scope = ?query.route_scope,
            "Context query completed"
        );

        Ok(scored)
    }

    async fn trends(&self) -> Result<TrendReport> {
        let cutoff = (Utc::now() - self.trend_window).max(self.horizon_cutoff());
        let entries = self.repo.scan(cutoff).await?;

        let mut location_freq: HashMap<String, usize> = HashMap::new();
        let mut by_category: HashMap<String, usize> = HashMap::new();

        for entry in &entries {
            if let Some(location) = &entry.location {
                *location_freq.entry(location.clone()).or_insert(0) += 1;
            }
            *by_category.entry(entry.category.clone()).or_insert(0) += 1;
        }

        let mut hotspots: Vec<(String, usize)> = location_freq.iter().map(|(l, c)| (l.clone(), *c)).collect();
        hotspots.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hotspots.truncate(5);

        let mut recurring_locations: Vec<String> = location_freq
            .into_iter()
            .filter(|(_, count)| *count >= self.recurrence_threshold)
            .map(|(location, _)| location)
            .collect();
        recurring_locations.sort();

        Ok(TrendReport {
            total_entries: entries.len(),
            hotspots,
            by_category,
            recurring_locations,
        })
    }

    async fn prune_expired(&self) -> Result<usize> {
        let pruned = self.repo.delete_older_than(self.horizon_cutoff()).await?;
        if pruned > 0 {
            self.event_sink
                .publish(ContextEvent::EntriesPruned {
                    pruned_count: pruned,
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{HashingEmbedder, InMemoryEntryRepository};

    fn store() -> StandardContextStore {
        StandardContextStore::new(
            Arc::new(InMemoryEntryRepository::new()),
            Arc::new(HashingEmbedder::default()),
            Arc::new(NoopEventSink),
        )
    }

    fn entry(route: Option<&str>, category: &str, location: Option<&str>, text: &str, age: Duration) -> NewEntry {
        NewEntry {
            route_scope: route.map(String::from),
            category: category.into(),
            location: location.map(String::from),
            text: text.into(),
            occurred_at: Utc::now() - age,
        }
    }

    #[tokio::test]
    async fn test_index_is_immediately_queryable() {
        let store = store();
        store
            .index(entry(None, "port_strike", Some("Rotterdam"), "port strike at rotterdam", Duration::zero()))
            .await
            .unwrap();

        let results = store
            .query(ContextQuery {
                anchor: "strike rotterdam".into(),
                route_scope: None,
                time_window: Duration::hours(24),
                limit: 5,
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_recency_breaks_similarity_ties() {
        let store = store();
        // Identical text, different ages: the fresh one must rank first.
        store
            .index(entry(None, "weather", None, "cyclone warning indian ocean", Duration::hours(20)))
            .await
            .unwrap();
        store
            .index(entry(None, "weather", None, "cyclone warning indian ocean", Duration::minutes(5)))
            .await
            .unwrap();

        let results = store
            .query(ContextQuery {
                anchor: "cyclone indian ocean".into(),
                route_scope: None,
                time_window: Duration::hours(24),
                limit: 5,
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].entry.occurred_at > results[1].entry.occurred_at);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_window_excludes_old_entries() {
        let store = store();
        store
            .index(entry(None, "weather", None, "old cyclone report", Duration::hours(48)))
            .await
            .unwrap();

        let results = store
            .query(ContextQuery {
                anchor: "cyclone".into(),
                route_scope: None,
                time_window: Duration::hours(24),
                limit: 5,
            })
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_route_scoping() {
        let store = store();
        store
            .index(entry(Some("route-a"), "road_closure", None, "highway closure near salem", Duration::zero()))
            .await
            .unwrap();

        let foreign = store
            .query(ContextQuery {
                anchor: "highway closure".into(),
                route_scope: Some("route-b".into()),
                time_window: Duration::hours(24),
                limit: 5,
            })
            .await
            .unwrap();
        assert!(foreign.is_empty());

        let scoped = store
            .query(ContextQuery {
                anchor: "highway closure".into(),
                route_scope: Some("route-a".into()),
                time_window: Duration::hours(24),
                limit: 5,
            })
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
    }

    #[tokio::test]
    async fn test_trends_and_recurrence() {
        let store = store().with_recurrence_threshold(2);
        for _ in 0..3 {
            store
                .index(entry(None, "port_strike", Some("Chennai"), "strike chennai", Duration::hours(1)))
                .await
                .unwrap();
        }
        store
            .index(entry(None, "weather", Some("Mumbai"), "storm mumbai", Duration::hours(1)))
            .await
            .unwrap();

        let report = store.trends().await.unwrap();
        assert_eq!(report.total_entries, 4);
        assert_eq!(report.hotspots[0].0, "Chennai");
        assert_eq!(report.by_category["port_strike"], 3);
        assert_eq!(report.recurring_locations, vec!["Chennai".to_string()]);
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let store = store().with_retention_horizon(Duration::days(1));
        store
            .index(entry(None, "weather", None, "ancient storm", Duration::days(3)))
            .await
            .unwrap();
        store
            .index(entry(None, "weather", None, "fresh storm", Duration::zero()))
            .await
            .unwrap();

        let pruned = store.prune_expired().await.unwrap();
        assert_eq!(pruned, 1);
    }
}
