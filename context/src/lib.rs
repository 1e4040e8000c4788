// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Sentinel Context Store
//!
//! The continuously updated semantic index ("living index") backing the
//! Decision Engine's RETRIEVE stage: recent disruption events are embedded
//! and inserted as they arrive, and queries rank entries by combined
//! similarity-and-recency score scoped to a route.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Similarity+recency retrieval over streaming events

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;
