// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Event Normalizer
//!
//! Canonicalizes heterogeneous raw records into the uniform `Event` shape.
//! Three rejection classes, all recovered locally: malformed input, staleness
//! past the watermark grace, and duplicates inside the dedup window. Records
//! carrying only a place name are resolved against a gazetteer of known
//! supply-chain hubs; an unresolved name still normalizes, it just cannot
//! intersect a corridor.
//!
//! The only state is the monotonic watermark and the dedup window map, both
//! behind one short-lived mutex.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::config::NormalizerConfig;
use crate::domain::event::{Event, EventCategory, EventId, RawRecord, RejectReason};
use crate::domain::geo::GeoPoint;

/// Known supply-chain hubs, checked before any external geocoding. Names are
/// matched case-insensitively in both containment directions, so
/// "port of rotterdam" and "Rotterdam" both resolve.
const KNOWN_HUBS: &[(&str, f64, f64)] = &[
    ("suez canal", 30.5, 32.3),
    ("panama canal", 9.1, -79.7),
    ("singapore", 1.3, 103.8),
    ("rotterdam", 51.9, 4.5),
    ("hamburg", 53.5, 10.0),
    ("los angeles", 33.7, -118.2),
    ("shanghai", 31.2, 121.5),
    ("mumbai", 19.0, 72.8),
    ("hong kong", 22.3, 114.2),
    ("dubai", 25.2, 55.3),
    ("strait of malacca", 2.5, 101.0),
    ("strait of hormuz", 26.5, 56.5),
    ("red sea", 20.0, 38.0),
    ("chennai", 13.08, 80.27),
    ("coimbatore", 11.01, 76.95),
    ("bangalore", 12.97, 77.59),
    ("salem", 11.66, 78.14),
    ("surat", 21.17, 72.83),
];

pub fn resolve_known_location(name: &str) -> Option<GeoPoint> {
    let needle = name.to_lowercase();
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    KNOWN_HUBS
        .iter()
        .find(|(hub, _, _)| needle.contains(hub) || hub.contains(needle))
        .map(|(_, lat, lng)| GeoPoint::new(*lat, *lng))
}

/// Rejection totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectCounts {
    pub malformed: u64,
    pub stale: u64,
    pub duplicate: u64,
}

struct NormalizerState {
    watermark: DateTime<Utc>,
    /// Dedup window: event id -> first-seen processing time.
    seen: HashMap<EventId, DateTime<Utc>>,
    counts: RejectCounts,
}

pub struct EventNormalizer {
    watermark_grace: Duration,
    dedup_window: Duration,
    dedup_bucket: Duration,
    state: Mutex<NormalizerState>,
}

impl EventNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        let to_chrono = |d: std::time::Duration| {
            Duration::from_std(d).unwrap_or_else(|_| Duration::minutes(15))
        };
        Self {
            watermark_grace: to_chrono(config.watermark_grace),
            dedup_window: to_chrono(config.dedup_window),
            dedup_bucket: to_chrono(config.dedup_bucket),
            state: Mutex::new(NormalizerState {
                watermark: DateTime::<Utc>::MIN_UTC,
                seen: HashMap::new(),
                counts: RejectCounts::default(),
            }),
        }
    }

    /// Canonicalize one raw record.
    pub fn normalize(&self, raw: RawRecord) -> Result<Event, RejectReason> {
        let now = Utc::now();

        let (timestamp, location) = match self.validate(&raw) {
            Ok(parts) => parts,
            Err(reason) => {
                self.state.lock().counts.malformed += 1;
                counter!("sentinel_events_rejected", "reason" => "malformed").increment(1);
                return Err(reason);
            }
        };

        if now - timestamp > self.watermark_grace {
            self.state.lock().counts.stale += 1;
            counter!("sentinel_events_rejected", "reason" => "stale").increment(1);
            return Err(RejectReason::StaleBeyondWatermark);
        }

        let id = EventId::derive(&raw.source_id, &raw.summary, timestamp, self.dedup_bucket);

        {
            let mut state = self.state.lock();

            // Evict dedup entries that fell out of the window before testing
            // membership, bounding the map.
            let window = self.dedup_window;
            state.seen.retain(|_, seen_at| now - *seen_at <= window);

            if state.seen.contains_key(&id) {
                state.counts.duplicate += 1;
                counter!("sentinel_events_rejected", "reason" => "duplicate").increment(1);
                return Err(RejectReason::DuplicateId);
            }
            state.seen.insert(id.clone(), now);

            if timestamp > state.watermark {
                state.watermark = timestamp;
            }
        }

        let category = raw
            .topic
            .as_deref()
            .map(EventCategory::parse)
            .unwrap_or_else(|| EventCategory::parse(&raw.summary));

        let event = Event {
            id,
            source_kind: raw.source_kind,
            category,
            location,
            location_name: raw.location_name,
            summary: raw.summary,
            timestamp,
            raw_severity: raw.severity.unwrap_or(5).min(10),
        };

        debug!(event_id = %event.id, category = event.category.as_str(), "Event normalized");
        counter!("sentinel_events_normalized").increment(1);

        Ok(event)
    }

    fn validate(
        &self,
        raw: &RawRecord,
    ) -> Result<(DateTime<Utc>, Option<GeoPoint>), RejectReason> {
        if raw.source_id.trim().is_empty() {
            return Err(RejectReason::MalformedInput("missing source id".into()));
        }
        if raw.summary.trim().is_empty() {
            return Err(RejectReason::MalformedInput("empty summary".into()));
        }
        let timestamp = raw
            .timestamp
            .ok_or_else(|| RejectReason::MalformedInput("missing timestamp".into()))?;

        let location = match raw.location {
            Some(point) if !point.is_valid() => {
                return Err(RejectReason::MalformedInput("coordinates off the globe".into()));
            }
            Some(point) => Some(point),
            None => raw
                .location_name
                .as_deref()
                .and_then(resolve_known_location),
        };

        Ok((timestamp, location))
    }

    /// Highest event timestamp accepted so far.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.state.lock().watermark
    }

    pub fn reject_counts(&self) -> RejectCounts {
        self.state.lock().counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::SourceKind;

    fn normalizer() -> EventNormalizer {
        EventNormalizer::new(&NormalizerConfig::default())
    }

    fn raw(summary: &str) -> RawRecord {
        RawRecord {
            source_id: "gdelt".into(),
            source_kind: SourceKind::News,
            timestamp: Some(Utc::now()),
            location: None,
            location_name: Some("Rotterdam".into()),
            topic: Some("Port Strike".into()),
            summary: summary.into(),
            severity: Some(7),
        }
    }

    #[test]
    fn test_normalizes_valid_record() {
        let n = normalizer();
        let event = n.normalize(raw("Port strike at Rotterdam")).unwrap();

        assert_eq!(event.category, EventCategory::PortStrike);
        assert_eq!(event.raw_severity, 7);
        // Gazetteer resolved the place name.
        let loc = event.location.unwrap();
        assert!((loc.lat - 51.9).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_malformed_records() {
        let n = normalizer();

        let mut no_summary = raw("");
        no_summary.summary = "  ".into();
        assert!(matches!(
            n.normalize(no_summary),
            Err(RejectReason::MalformedInput(_))
        ));

        let mut no_ts = raw("x");
        no_ts.timestamp = None;
        assert!(matches!(n.normalize(no_ts), Err(RejectReason::MalformedInput(_))));

        let mut bad_coords = raw("y");
        bad_coords.location = Some(GeoPoint::new(123.0, 80.0));
        assert!(matches!(
            n.normalize(bad_coords),
            Err(RejectReason::MalformedInput(_))
        ));

        assert_eq!(n.reject_counts().malformed, 3);
    }

    #[test]
    fn test_rejects_stale_records() {
        let n = normalizer();
        let mut stale = raw("ancient news");
        stale.timestamp = Some(Utc::now() - Duration::hours(2));

        assert_eq!(n.normalize(stale), Err(RejectReason::StaleBeyondWatermark));
        assert_eq!(n.reject_counts().stale, 1);
    }

    #[test]
    fn test_drops_duplicates_within_window() {
        let n = normalizer();
        let first = raw("Port strike at Rotterdam");
        let second = first.clone();

        assert!(n.normalize(first).is_ok());
        assert_eq!(n.normalize(second), Err(RejectReason::DuplicateId));
        assert_eq!(n.reject_counts().duplicate, 1);
    }

    #[test]
    fn test_distinct_content_is_not_a_duplicate() {
        let n = normalizer();
        assert!(n.normalize(raw("Port strike at Rotterdam")).is_ok());
        assert!(n.normalize(raw("Canal blockage at Suez")).is_ok());
    }

    #[test]
    fn test_watermark_advances_monotonically() {
        let n = normalizer();
        let now = Utc::now();

        let mut newer = raw("newer");
        newer.timestamp = Some(now);
        n.normalize(newer).unwrap();
        let after_newer = n.watermark();

        let mut older = raw("older but within grace");
        older.timestamp = Some(now - Duration::minutes(5));
        n.normalize(older).unwrap();

        assert_eq!(n.watermark(), after_newer);
    }

    #[test]
    fn test_gazetteer_resolution() {
        assert!(resolve_known_location("Suez Canal").is_some());
        assert!(resolve_known_location("port of rotterdam").is_some());
        assert!(resolve_known_location("Middle of Nowhere, Atlantis").is_none());
        assert!(resolve_known_location("").is_none());
    }

    #[test]
    fn test_unresolved_location_still_normalizes() {
        let n = normalizer();
        let mut record = raw("Unrest reported");
        record.location_name = Some("Atlantis".into());
        let event = n.normalize(record).unwrap();
        assert!(event.location.is_none());
        assert_eq!(event.location_name.as_deref(), Some("Atlantis"));
    }
}
