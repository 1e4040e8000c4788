// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod embedding;
pub mod memory_store;
pub mod repository;

pub use embedding::{Embedder, EmbeddingError, HashingEmbedder, HttpEmbedder};
pub use memory_store::InMemoryEntryRepository;
pub use repository::{EntryFilter, EntryRepository};
