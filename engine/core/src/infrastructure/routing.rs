// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Route planner port and implementations.
//!
//! Route geometry is an external collaborator: given two coordinates the
//! planner returns a polyline. `OsrmRoutePlanner` queries an OSRM HTTP
//! service; `GreatCirclePlanner` interpolates a straight line, which keeps
//! tests and offline deployments deterministic.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::geo::GeoPoint;

#[derive(Debug, thiserror::Error)]
pub enum RoutePlanError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Routing failed: {0}")]
    Provider(String),

    #[error("Invalid coordinates")]
    InvalidCoordinates,
}

#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Polyline from origin to destination, origin first.
    async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<GeoPoint>, RoutePlanError>;
}

// ---------------------------------------------------------------------------
// OSRM
// ---------------------------------------------------------------------------

pub struct OsrmRoutePlanner {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [lng, lat]
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRoutePlanner {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }
}

#[async_trait]
impl RoutePlanner for OsrmRoutePlanner {
    async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<GeoPoint>, RoutePlanError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RoutePlanError::InvalidCoordinates);
        }

        // OSRM takes lng,lat pairs.
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.endpoint.trim_end_matches('/'),
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RoutePlanError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoutePlanError::Provider(format!(
                "OSRM returned HTTP {}",
                response.status()
            )));
        }

        let parsed: OsrmResponse = response
            .json()
            .await
            .map_err(|e| RoutePlanError::Provider(format!("Failed to parse response: {}", e)))?;

        if parsed.code != "Ok" {
            return Err(RoutePlanError::Provider(parsed.code));
        }

        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RoutePlanError::Provider("No routes returned".into()))?;

        Ok(route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint::new(lat, lng))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Great-circle interpolation
// ---------------------------------------------------------------------------

pub struct GreatCirclePlanner {
    segments: usize,
}

impl GreatCirclePlanner {
    pub fn new(segments: usize) -> Self {
        Self {
            segments: segments.max(1),
        }
    }
}

impl Default for GreatCirclePlanner {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl RoutePlanner for GreatCirclePlanner {
    async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<GeoPoint>, RoutePlanError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RoutePlanError::InvalidCoordinates);
        }

        let mut waypoints = Vec::with_capacity(self.segments + 1);
        for i in 0..=self.segments {
            let t = i as f64 / self.segments as f64;
            waypoints.push(GeoPoint::new(
                origin.lat + t * (destination.lat - origin.lat),
                origin.lng + t * (destination.lng - origin.lng),
            ));
        }
        Ok(waypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_great_circle_endpoints_and_length() {
        let planner = GreatCirclePlanner::new(10);
        let origin = GeoPoint::new(13.08, 80.27);
        let destination = GeoPoint::new(21.17, 72.83);

        let polyline = planner.plan(origin, destination).await.unwrap();

        assert_eq!(polyline.len(), 11);
        assert_eq!(polyline[0], origin);
        assert_eq!(polyline[10], destination);
    }

    #[tokio::test]
    async fn test_great_circle_rejects_invalid_coordinates() {
        let planner = GreatCirclePlanner::default();
        let result = planner
            .plan(GeoPoint::new(120.0, 80.0), GeoPoint::new(0.0, 0.0))
            .await;
        assert!(matches!(result, Err(RoutePlanError::InvalidCoordinates)));
    }
}
