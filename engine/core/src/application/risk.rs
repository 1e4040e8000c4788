// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Risk scoring: `severity(event) × impact(shipment)`, bounded to 0–100.
//!
//! Pure and deterministic so every mapping can be tested exhaustively.
//! Both maps are monotone by construction:
//!
//! - **Severity (1–10):** a fixed per-category base plus one third of the
//!   source-reported magnitude, clamped. Raising the reported magnitude
//!   never lowers severity.
//! - **Impact (0.1–1.0):** `0.1 + 0.5·value_norm + 0.3·perishable +
//!   0.1·journey_remaining`, where `value_norm` saturates at $1M. Raising
//!   cargo value or marking cargo perishable never lowers impact.

use crate::domain::event::{Event, EventCategory};
use crate::domain::route::Shipment;

/// Cargo value at which the value term saturates.
const VALUE_SATURATION_USD: f64 = 1_000_000.0;

/// Fixed severity base per category, on the 1–10 scale.
fn category_base(category: EventCategory) -> f64 {
    match category {
        EventCategory::CanalBlockage => 8.0,
        EventCategory::PortStrike => 6.0,
        EventCategory::GeopoliticalTension => 5.0,
        EventCategory::Weather => 4.0,
        EventCategory::RoadClosure => 4.0,
        EventCategory::TradeTariff => 3.0,
        EventCategory::Other => 2.0,
    }
}

/// Event severity on the fixed 1–10 scale.
pub fn severity(event: &Event) -> f64 {
    (category_base(event.category) + f64::from(event.raw_severity) / 3.0).clamp(1.0, 10.0)
}

/// Shipment impact weight in [0.1, 1.0].
pub fn impact(shipment: &Shipment) -> f64 {
    let value_norm = (shipment.cargo.value_usd / VALUE_SATURATION_USD).clamp(0.0, 1.0);
    let perishable = if shipment.cargo.perishable { 1.0 } else { 0.0 };
    let journey_remaining = 1.0 - shipment.progress.clamp(0.0, 1.0);

    (0.1 + 0.5 * value_norm + 0.3 * perishable + 0.1 * journey_remaining).min(1.0)
}

/// Combine precomputed severity and impact into the 0–100 risk score.
pub fn score_parts(severity: f64, impact: f64) -> f64 {
    (severity.clamp(1.0, 10.0) * impact.clamp(0.1, 1.0) * 10.0).clamp(0.0, 100.0)
}

/// Risk of `event` against `shipment`, 0–100.
pub fn score(event: &Event, shipment: &Shipment) -> f64 {
    score_parts(severity(event), impact(shipment))
}
