// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Detection metrics: how fast the engine notices and reacts.
//!
//! MTTD is the mean gap between when an event occurred and when the engine
//! detected it; MTTA the mean gap between detection and a committed action.
//! Negative gaps (clock skew between sources) are excluded from the means
//! rather than dragging them below zero.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::counter;

use crate::domain::event::EventId;

#[derive(Debug, Clone, Copy)]
struct Timings {
    occurred_at: DateTime<Utc>,
    detected_at: DateTime<Utc>,
    action_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Mean time to detect, seconds. `None` until something was detected.
    pub mttd_seconds: Option<f64>,
    /// Mean time to act, seconds. `None` until something was acted on.
    pub mtta_seconds: Option<f64>,
    pub events_seen: usize,
    pub actions_taken: usize,
}

#[derive(Default)]
pub struct DetectionMetrics {
    events: DashMap<EventId, Timings>,
}

impl DetectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an event was detected now.
    pub fn track_detection(&self, event_id: &EventId, occurred_at: DateTime<Utc>) {
        counter!("sentinel_detections").increment(1);
        self.events.insert(
            event_id.clone(),
            Timings {
                occurred_at,
                detected_at: Utc::now(),
                action_at: None,
            },
        );
    }

    /// Record that an action for this event was committed now.
    pub fn track_action(&self, event_id: &EventId) {
        counter!("sentinel_actions_taken").increment(1);
        if let Some(mut timings) = self.events.get_mut(event_id) {
            timings.action_at = Some(Utc::now());
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut detect_gaps = Vec::new();
        let mut action_gaps = Vec::new();
        let mut actions_taken = 0usize;
        let mut events_seen = 0usize;

        for entry in self.events.iter() {
            events_seen += 1;
            let t = *entry.value();

            let detect = (t.detected_at - t.occurred_at).num_milliseconds() as f64 / 1000.0;
            if detect >= 0.0 {
                detect_gaps.push(detect);
            }

            if let Some(action_at) = t.action_at {
                actions_taken += 1;
                let act = (action_at - t.detected_at).num_milliseconds() as f64 / 1000.0;
                if act >= 0.0 {
                    action_gaps.push(act);
                }
            }
        }

        let mean = |v: &[f64]| {
            if v.is_empty() {
                None
            } else {
                Some(v.iter().sum::<f64>() / v.len() as f64)
            }
        };

        MetricsSnapshot {
            mttd_seconds: mean(&detect_gaps),
            mtta_seconds: mean(&action_gaps),
            events_seen,
            actions_taken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_empty_snapshot() {
        let m = DetectionMetrics::new();
        let snap = m.snapshot();
        assert_eq!(snap.events_seen, 0);
        assert_eq!(snap.actions_taken, 0);
        assert_eq!(snap.mttd_seconds, None);
        assert_eq!(snap.mtta_seconds, None);
    }

    #[test]
    fn test_mttd_reflects_detection_lag() {
        let m = DetectionMetrics::new();
        let id = EventId("e1".into());
        m.track_detection(&id, Utc::now() - Duration::seconds(10));

        let snap = m.snapshot();
        assert_eq!(snap.events_seen, 1);
        let mttd = snap.mttd_seconds.unwrap();
        assert!(mttd >= 9.0 && mttd < 12.0, "got {mttd}");
        assert_eq!(snap.mtta_seconds, None);
    }

    #[test]
    fn test_action_tracking() {
        let m = DetectionMetrics::new();
        let acted = EventId("acted".into());
        let ignored = EventId("ignored".into());

        m.track_detection(&acted, Utc::now());
        m.track_detection(&ignored, Utc::now());
        m.track_action(&acted);

        let snap = m.snapshot();
        assert_eq!(snap.events_seen, 2);
        assert_eq!(snap.actions_taken, 1);
        assert!(snap.mtta_seconds.unwrap() >= 0.0);
    }

    #[test]
    fn test_future_occurrence_excluded_from_mttd() {
        let m = DetectionMetrics::new();
        // Source clock ahead of ours: the gap is negative and excluded.
        m.track_detection(&EventId("skewed".into()), Utc::now() + Duration::seconds(60));
        assert_eq!(m.snapshot().mttd_seconds, None);
    }

    #[test]
    fn test_action_for_unknown_event_is_ignored() {
        let m = DetectionMetrics::new();
        m.track_action(&EventId("never-detected".into()));
        assert_eq!(m.snapshot().actions_taken, 0);
    }
}
