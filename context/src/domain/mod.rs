// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod entry;
pub mod events;

pub use entry::{ContextEntry, EntryId, NewEntry, ScoredEntry, combined_score};
pub use events::ContextEvent;
