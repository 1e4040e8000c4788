// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Corridor Index — buffered-polyline membership tests.
//!
//! Write-rare, read-heavy: queries take the read guard concurrently;
//! registration and unregistration take the write guard only for the
//! duration of the structural update. A zero-length route (single waypoint)
//! degrades to a point-radius test inside `min_distance_km`.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::geo::{haversine_km, point_to_segment_km, GeoPoint};
use crate::domain::route::{Route, RouteId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorridorError {
    #[error("Unknown route: {0}")]
    UnknownRoute(RouteId),

    #[error("Route polyline is empty")]
    EmptyPolyline,
}

#[derive(Default)]
pub struct CorridorIndex {
    routes: RwLock<HashMap<RouteId, Route>>,
}

impl CorridorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, route: Route) -> Result<RouteId, CorridorError> {
        if route.waypoints.is_empty() {
            return Err(CorridorError::EmptyPolyline);
        }
        let id = route.id;
        self.routes.write().insert(id, route);
        Ok(id)
    }

    pub fn unregister(&self, route_id: RouteId) -> Result<Route, CorridorError> {
        self.routes
            .write()
            .remove(&route_id)
            .ok_or(CorridorError::UnknownRoute(route_id))
    }

    pub fn route(&self, route_id: RouteId) -> Option<Route> {
        self.routes.read().get(&route_id).cloned()
    }

    pub fn registered_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Minimum distance from `point` to any segment of the polyline.
    fn min_distance_km(route: &Route, point: GeoPoint) -> f64 {
        match route.waypoints.len() {
            0 => f64::INFINITY,
            1 => haversine_km(point, route.waypoints[0]),
            _ => route
                .waypoints
                .windows(2)
                .map(|seg| point_to_segment_km(point, seg[0], seg[1]))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn is_within_corridor(
        &self,
        route_id: RouteId,
        point: GeoPoint,
    ) -> Result<bool, CorridorError> {
        let routes = self.routes.read();
        let route = routes
            .get(&route_id)
            .ok_or(CorridorError::UnknownRoute(route_id))?;
        Ok(Self::min_distance_km(route, point) <= route.corridor_radius_km)
    }

    /// All registered routes whose corridor contains `point`.
    pub fn affected_routes(&self, point: GeoPoint) -> Vec<RouteId> {
        self.routes
            .read()
            .values()
            .filter(|route| Self::min_distance_km(route, point) <= route.corridor_radius_km)
            .map(|route| route.id)
            .collect()
    }
}
