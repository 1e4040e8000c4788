// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory implementation of `EntryRepository`.
//!
//! The map lives behind a tokio `RwLock`: inserts take the write guard, so a
//! concurrent query either runs before the insert or after it completes;
//! atomic visibility falls out of the lock. Search is a linear cosine scan,
//! which is fine for the retention horizons this store is configured with
//! (thousands of live entries, not millions).

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{ContextEntry, EntryId};
use crate::infrastructure::repository::{EntryFilter, EntryRepository};

pub struct InMemoryEntryRepository {
    entries: Arc<RwLock<HashMap<EntryId, (ContextEntry, Vec<f32>)>>>,
}

impl InMemoryEntryRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if magnitude_a == 0.0 || magnitude_b == 0.0 {
            return 0.0;
        }

        (dot_product / (magnitude_a * magnitude_b)) as f64
    }
}

impl Default for InMemoryEntryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryRepository {
    async fn insert(&self, entry: ContextEntry, embedding: Vec<f32>) -> Result<EntryId> {
        let mut entries = self.entries.write().await;
        let id = entry.id;
        entries.insert(id, (entry, embedding));
        Ok(id)
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        filter: &EntryFilter,
        limit: usize,
    ) -> Result<Vec<(ContextEntry, f64)>> {
        let entries = self.entries.read().await;

        let mut results: Vec<(ContextEntry, f64)> = entries
            .values()
            .filter(|(entry, _)| entry.occurred_at >= filter.occurred_after)
            .filter(|(entry, _)| entry.matches_scope(filter.route_scope.as_deref()))
            .map(|(entry, embedding)| {
                let similarity = Self::cosine_similarity(query_embedding, embedding);
                (entry.clone(), similarity)
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn scan(&self, occurred_after: DateTime<Utc>) -> Result<Vec<ContextEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|(entry, _)| entry.occurred_at >= occurred_after)
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    async fn delete_older_than(&self, horizon: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (entry, _)| entry.occurred_at >= horizon);
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewEntry;
    use chrono::Duration;

    fn entry(route: Option<&str>, text: &str, age: Duration) -> ContextEntry {
        ContextEntry::from_new(NewEntry {
            route_scope: route.map(String::from),
            category: "test".into(),
            location: None,
            text: text.into(),
            occurred_at: Utc::now() - age,
        })
    }

    fn open_filter() -> EntryFilter {
        EntryFilter {
            route_scope: None,
            occurred_after: Utc::now() - Duration::days(365),
        }
    }

    #[tokio::test]
    async fn test_insert_then_search() {
        let repo = InMemoryEntryRepository::new();
        let e = entry(None, "port strike at rotterdam", Duration::zero());
        let id = repo.insert(e, vec![1.0, 0.0, 0.0]).await.unwrap();

        let results = repo
            .search_similar(&[0.9, 0.1, 0.0], &open_filter(), 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, id);
        assert!(results[0].1 > 0.9);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let repo = InMemoryEntryRepository::new();
        let a = entry(None, "a", Duration::zero());
        let a_id = a.id;
        repo.insert(a, vec![1.0, 0.0]).await.unwrap();
        repo.insert(entry(None, "b", Duration::zero()), vec![0.0, 1.0])
            .await
            .unwrap();

        let results = repo
            .search_similar(&[1.0, 0.0], &open_filter(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, a_id);
        assert!(results[0].1 > results[1].1);
    }

    #[tokio::test]
    async fn test_filter_excludes_old_and_foreign_scope() {
        let repo = InMemoryEntryRepository::new();
        repo.insert(entry(Some("route-a"), "scoped", Duration::zero()), vec![1.0])
            .await
            .unwrap();
        repo.insert(entry(None, "too old", Duration::days(30)), vec![1.0])
            .await
            .unwrap();

        let filter = EntryFilter {
            route_scope: Some("route-b".into()),
            occurred_after: Utc::now() - Duration::days(1),
        };
        let results = repo.search_similar(&[1.0], &filter, 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let repo = InMemoryEntryRepository::new();
        repo.insert(entry(None, "fresh", Duration::zero()), vec![1.0])
            .await
            .unwrap();
        repo.insert(entry(None, "stale", Duration::days(90)), vec![1.0])
            .await
            .unwrap();

        let pruned = repo
            .delete_older_than(Utc::now() - Duration::days(7))
            .await
            .unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(repo.len().await.unwrap(), 1);
    }
}
