// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository port for indexed context entries.
//!
//! Implementations must make an insert visible to queries atomically: a
//! query running concurrently with `insert` sees either the whole entry or
//! nothing, never a torn state.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::{ContextEntry, EntryId};

/// Visibility filter applied during similarity search.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    /// Route scope; `None` matches only unscoped entries plus everything
    /// (see `ContextEntry::matches_scope`).
    pub route_scope: Option<String>,
    /// Entries that occurred before this instant are invisible.
    pub occurred_after: DateTime<Utc>,
}

#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Insert an entry with its embedding. Atomic from the perspective of
    /// concurrent `search_similar`/`scan` calls.
    async fn insert(&self, entry: ContextEntry, embedding: Vec<f32>) -> Result<EntryId>;

    /// Cosine-similarity search over entries passing the filter.
    /// Returns up to `limit` (entry, similarity) pairs, unordered contract:
    /// callers re-rank by combined score.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        filter: &EntryFilter,
        limit: usize,
    ) -> Result<Vec<(ContextEntry, f64)>>;

    /// All entries that occurred after the cutoff, for trend scans.
    async fn scan(&self, occurred_after: DateTime<Utc>) -> Result<Vec<ContextEntry>>;

    /// Remove entries that occurred before the horizon. Returns the count.
    async fn delete_older_than(&self, horizon: DateTime<Utc>) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}
