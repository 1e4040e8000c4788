// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Append-only audit trail sinks.
//!
//! The public contract has no update and no delete: `append` must be durable
//! before it returns, and `read_all` returns records in insertion order with
//! monotonically increasing sequence numbers. The file-backed sink writes
//! one JSON object per line and fsyncs before acknowledging; sequence
//! assignment happens under the same lock as the write, so sequence order
//! and file order cannot diverge.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::disruption::AuditRecord;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    Io(String),

    #[error("Audit serialization failed: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist the record durably and return its assigned sequence number.
    async fn append(&self, record: AuditRecord) -> Result<u64, AuditError>;

    /// All records, in insertion order.
    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError>;
}

// ---------------------------------------------------------------------------
// In-memory sink (tests, non-durable deployments)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAuditSink {
    records: parking_lot::Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, mut record: AuditRecord) -> Result<u64, AuditError> {
        let mut records = self.records.lock();
        let sequence = records.len() as u64;
        record.sequence = sequence;
        records.push(record);
        Ok(sequence)
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self.records.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// JSONL file sink
// ---------------------------------------------------------------------------

pub struct JsonlAuditSink {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
    next_sequence: AtomicU64,
}

impl JsonlAuditSink {
    /// Open (or create) the trail at `path`. An existing trail is scanned so
    /// sequence numbers continue where the previous process stopped.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();

        let next_sequence = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .last()
                .map(|line| {
                    serde_json::from_str::<AuditRecord>(line)
                        .map(|r| r.sequence + 1)
                        .map_err(|e| AuditError::Serialization(e.to_string()))
                })
                .transpose()?
                .unwrap_or(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(AuditError::Io(e.to_string())),
        };

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;

        debug!(path = %path.display(), next_sequence, "Opened audit trail");

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
            next_sequence: AtomicU64::new(next_sequence),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, mut record: AuditRecord) -> Result<u64, AuditError> {
        // Sequence assignment and the write happen under one lock so file
        // order always equals sequence order.
        let mut file = self.file.lock().await;

        let sequence = self.next_sequence.load(Ordering::SeqCst);
        record.sequence = sequence;

        let mut line = serde_json::to_string(&record)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        line.push('\n');

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| AuditError::Io(e.to_string()))?;
        // Durable before the call is considered complete.
        file.sync_all()
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;

        self.next_sequence.store(sequence + 1, Ordering::SeqCst);
        Ok(sequence)
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        // Hold the writer lock so a read never observes a half-written line.
        let _file = self.file.lock().await;

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(AuditError::Io(e.to_string())),
        };

        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| AuditError::Serialization(e.to_string()))
            })
            .collect()
    }
}
