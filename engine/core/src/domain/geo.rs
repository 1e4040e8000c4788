// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Geospatial primitives for corridor membership tests.
//!
//! Distances are great-circle (haversine); the point-to-segment projection
//! runs in a local equirectangular plane centered on the segment, which is
//! accurate to well under a percent at corridor scales (tens to a few
//! hundred km) and keeps the math pure and exhaustively testable.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Coordinates that exist on the globe.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Minimum distance in kilometers from `point` to the segment `a`–`b`,
/// projection clamped to the endpoints.
pub fn point_to_segment_km(point: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    // Degenerate segment: plain point distance.
    if a.lat == b.lat && a.lng == b.lng {
        return haversine_km(point, a);
    }

    let ref_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let (px, py) = to_local_km(point, ref_lat);
    let (ax, ay) = to_local_km(a, ref_lat);
    let (bx, by) = to_local_km(b, ref_lat);

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;

    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Equirectangular projection into a km-scaled plane at `ref_lat` (radians).
pub fn to_local_km(point: GeoPoint, ref_lat: f64) -> (f64, f64) {
    let x = point.lng.to_radians() * ref_lat.cos() * EARTH_RADIUS_KM;
    let y = point.lat.to_radians() * EARTH_RADIUS_KM;
    (x, y)
}

/// Inverse of [`to_local_km`] for the same `ref_lat`.
pub fn from_local_km(x: f64, y: f64, ref_lat: f64) -> GeoPoint {
    GeoPoint {
        lat: (y / EARTH_RADIUS_KM).to_degrees(),
        lng: (x / (ref_lat.cos() * EARTH_RADIUS_KM)).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Chennai to Mumbai, roughly 1030 km.
        let chennai = GeoPoint::new(13.08, 80.27);
        let mumbai = GeoPoint::new(19.0, 72.8);
        let d = haversine_km(chennai, mumbai);
        assert!((d - 1030.0).abs() < 30.0, "got {d}");
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = GeoPoint::new(1.3, 103.8);
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn test_point_on_segment_has_zero_distance() {
        let a = GeoPoint::new(10.0, 80.0);
        let b = GeoPoint::new(20.0, 80.0);
        let mid = GeoPoint::new(15.0, 80.0);
        assert!(point_to_segment_km(mid, a, b) < 1.0);
    }

    #[test]
    fn test_projection_clamps_to_endpoints() {
        let a = GeoPoint::new(10.0, 80.0);
        let b = GeoPoint::new(12.0, 80.0);
        // Well past the northern endpoint: distance should equal the
        // distance to `b`, not to the infinite line.
        let beyond = GeoPoint::new(15.0, 80.0);
        let seg = point_to_segment_km(beyond, a, b);
        let direct = haversine_km(beyond, b);
        assert!((seg - direct).abs() < 2.0, "seg {seg} direct {direct}");
    }

    #[test]
    fn test_degenerate_segment_is_point_distance() {
        let p = GeoPoint::new(0.0, 0.0);
        let q = GeoPoint::new(1.0, 0.0);
        let seg = point_to_segment_km(q, p, p);
        let direct = haversine_km(q, p);
        assert!((seg - direct).abs() < 1e-6);
    }

    #[test]
    fn test_local_projection_round_trips() {
        let ref_lat = 17.0_f64.to_radians();
        let p = GeoPoint::new(17.12, 76.55);
        let (x, y) = to_local_km(p, ref_lat);
        let back = from_local_km(x, y, ref_lat);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lng - p.lng).abs() < 1e-9);
    }

    #[test]
    fn test_perpendicular_offset_distance_matches() {
        // Construct a point exactly 150 km perpendicular from the segment
        // midpoint in the projection plane; the measured distance must agree.
        let a = GeoPoint::new(13.08, 80.27);
        let b = GeoPoint::new(21.17, 72.83);
        let ref_lat = ((a.lat + b.lat) / 2.0).to_radians();
        let (ax, ay) = to_local_km(a, ref_lat);
        let (bx, by) = to_local_km(b, ref_lat);
        let (dx, dy) = (bx - ax, by - ay);
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = (-dy / len, dx / len);
        let (mx, my) = ((ax + bx) / 2.0, (ay + by) / 2.0);
        let offset = from_local_km(mx + 150.0 * nx, my + 150.0 * ny, ref_lat);

        let d = point_to_segment_km(offset, a, b);
        assert!((d - 150.0).abs() < 1.0, "got {d}");
    }
}
