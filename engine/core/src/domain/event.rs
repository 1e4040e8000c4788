// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Canonical event shape produced by the normalizer.
//!
//! Raw records arrive from heterogeneous sources (news feeds, weather
//! alerts, fleet telemetry) already parsed into `RawRecord`; everything
//! downstream of the normalizer sees only the immutable `Event`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::geo::GeoPoint;

/// Stable content-hash identity. Two records from the same source with the
/// same content in the same coarse time bucket get the same id, which is
/// what the dedup window keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// SHA-256 over source id, content, and a coarse timestamp bucket.
    pub fn derive(
        source_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
        bucket: Duration,
    ) -> Self {
        let bucket_secs = bucket.num_seconds().max(1);
        let bucket_index = timestamp.timestamp().div_euclid(bucket_secs);

        let mut hasher = Sha256::new();
        hasher.update(source_id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(content.as_bytes());
        hasher.update([0x1f]);
        hasher.update(bucket_index.to_be_bytes());

        Self(hex_encode(&hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    News,
    Weather,
    Telemetry,
}

/// Disruption category, parsed out of free-form source topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    PortStrike,
    CanalBlockage,
    GeopoliticalTension,
    TradeTariff,
    Weather,
    RoadClosure,
    Other,
}

impl EventCategory {
    /// Best-effort mapping from source topic strings
    /// ("Port Strike", "Canal Blockage", "Cyclone", ...).
    pub fn parse(topic: &str) -> Self {
        let t = topic.to_lowercase();
        if t.contains("strike") {
            Self::PortStrike
        } else if t.contains("blockage") || t.contains("blocked") {
            Self::CanalBlockage
        } else if t.contains("tension") || t.contains("conflict") {
            Self::GeopoliticalTension
        } else if t.contains("tariff") {
            Self::TradeTariff
        } else if t.contains("cyclone")
            || t.contains("storm")
            || t.contains("flood")
            || t.contains("fog")
            || t.contains("hurricane")
            || t.contains("weather")
        {
            Self::Weather
        } else if t.contains("closure") || t.contains("roadblock") || t.contains("traffic") {
            Self::RoadClosure
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortStrike => "port_strike",
            Self::CanalBlockage => "canal_blockage",
            Self::GeopoliticalTension => "geopolitical_tension",
            Self::TradeTariff => "trade_tariff",
            Self::Weather => "weather",
            Self::RoadClosure => "road_closure",
            Self::Other => "other",
        }
    }
}

/// Source-specific record as handed over by an ingestion adapter.
/// Only `source_id`, `summary` and `timestamp` are required to normalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_id: String,
    pub source_kind: SourceKind,
    pub timestamp: Option<DateTime<Utc>>,
    /// Coordinates, when the source provides them.
    pub location: Option<GeoPoint>,
    /// Place name, resolved against the gazetteer when coordinates are absent.
    pub location_name: Option<String>,
    pub topic: Option<String>,
    pub summary: String,
    /// Source-reported severity on a 0–10 scale, clamped on normalize.
    pub severity: Option<u8>,
}

/// Canonical, immutable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub source_kind: SourceKind,
    pub category: EventCategory,
    pub location: Option<GeoPoint>,
    pub location_name: Option<String>,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub raw_severity: u8,
}

/// Why a raw record did not become an `Event`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Event timestamp lags the watermark beyond the grace period")]
    StaleBeyondWatermark,

    #[error("Duplicate event id within the dedup window")]
    DuplicateId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_stable_within_bucket() {
        let ts = Utc::now();
        let a = EventId::derive("gdelt", "port strike rotterdam", ts, Duration::minutes(5));
        let b = EventId::derive("gdelt", "port strike rotterdam", ts, Duration::minutes(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_event_id_differs_across_sources_and_content() {
        let ts = Utc::now();
        let bucket = Duration::minutes(5);
        let a = EventId::derive("gdelt", "port strike", ts, bucket);
        let b = EventId::derive("reuters", "port strike", ts, bucket);
        let c = EventId::derive("gdelt", "canal blockage", ts, bucket);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_event_id_differs_across_buckets() {
        let ts = Utc::now();
        let bucket = Duration::minutes(5);
        let a = EventId::derive("gdelt", "port strike", ts, bucket);
        let b = EventId::derive("gdelt", "port strike", ts + Duration::minutes(10), bucket);
        assert_ne!(a, b);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(EventCategory::parse("Port Strike"), EventCategory::PortStrike);
        assert_eq!(EventCategory::parse("Canal Blockage"), EventCategory::CanalBlockage);
        assert_eq!(EventCategory::parse("Trade Tariff"), EventCategory::TradeTariff);
        assert_eq!(EventCategory::parse("Cyclone"), EventCategory::Weather);
        assert_eq!(EventCategory::parse("NH44 road closure"), EventCategory::RoadClosure);
        assert_eq!(EventCategory::parse("Pongal festival"), EventCategory::Other);
    }
}
