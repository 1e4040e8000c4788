// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Indexed context entries and the combined relevance score.
//!
//! An entry becomes queryable the moment `index` returns; relevance is
//! similarity to the query anchor down-weighted by age (exponential decay
//! over the query's time window). Entries past the retention horizon are
//! logically expired: they never appear in results and are pruned lazily.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Input shape for `ContextStore::index`. The store assigns the id and
/// computes the embedding.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Route this entry is scoped to, if any. Entries without a scope match
    /// every route (global events such as weather systems).
    pub route_scope: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
}

/// An entry as stored: immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: EntryId,
    pub route_scope: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

impl ContextEntry {
    pub fn from_new(new: NewEntry) -> Self {
        Self {
            id: EntryId::new(),
            route_scope: new.route_scope,
            category: new.category,
            location: new.location,
            text: new.text,
            occurred_at: new.occurred_at,
            indexed_at: Utc::now(),
        }
    }

    /// Whether this entry is visible to a query scoped to `route`.
    /// Unscoped entries are visible everywhere.
    pub fn matches_scope(&self, route: Option<&str>) -> bool {
        match (&self.route_scope, route) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(scope), Some(route)) => scope == route,
        }
    }
}

/// A query result: the entry plus the score it was ranked by.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: ContextEntry,
    pub similarity: f64,
    pub score: f64,
}

/// Combined similarity-and-recency score.
///
/// Similarity is clamped to [0, 1] (anti-correlated entries score zero, they
/// are not "negatively relevant"). Recency decays exponentially with a
/// half-life of half the query window, so an entry at the window edge keeps
/// a quarter of its similarity weight.
pub fn combined_score(similarity: f64, age: Duration, time_window: Duration) -> f64 {
    let sim = similarity.clamp(0.0, 1.0);
    let half_life_secs = (time_window.num_seconds() as f64 / 2.0).max(1.0);
    let age_secs = (age.num_seconds() as f64).max(0.0);
    let decay = 0.5_f64.powf(age_secs / half_life_secs);
    sim * decay
}
