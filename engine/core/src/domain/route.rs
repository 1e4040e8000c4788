// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Monitored routes and the shipments travelling them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub Uuid);

impl RouteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A monitored route: the polyline returned by the routing collaborator plus
/// the corridor radius events must fall within to be relevant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub waypoints: Vec<GeoPoint>,
    pub corridor_radius_km: f64,
    pub activated_at: DateTime<Utc>,
}

impl Route {
    pub fn new(waypoints: Vec<GeoPoint>, corridor_radius_km: f64) -> Self {
        Self {
            id: RouteId::new(),
            waypoints,
            corridor_radius_km,
            activated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentId(pub String);

impl ShipmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShipmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Cargo attributes that drive the impact half of the risk score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CargoProfile {
    /// Declared cargo value in USD.
    pub value_usd: f64,
    /// Perishable or otherwise time-critical cargo.
    pub perishable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    InTransit,
    Delivered,
    Cancelled,
}

/// A shipment in flight on a monitored route. Mutated as position updates
/// arrive, retired when delivered or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub route_id: RouteId,
    pub cargo: CargoProfile,
    /// Fraction of the route completed, in [0, 1].
    pub progress: f64,
    pub status: ShipmentStatus,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(id: ShipmentId, route_id: RouteId, cargo: CargoProfile) -> Self {
        Self {
            id,
            route_id,
            cargo,
            progress: 0.0,
            status: ShipmentStatus::InTransit,
            updated_at: Utc::now(),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress.clamp(0.0, 1.0);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ShipmentStatus::InTransit
    }
}
