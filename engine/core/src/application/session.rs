// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decision Session — the per-route cyclic state machine
//!
//! One session per monitored route, exclusively owning its cooldown and
//! counters. Disruptions for the same session are serialized through a
//! bounded queue; sessions for different routes run concurrently without
//! coordination.
//!
//! ## Cycle
//! | State | Work |
//! |-------|------|
//! | RETRIEVE | context query scoped to the route |
//! | ANALYZE | reasoning strategy (with deterministic fallback) |
//! | DECIDE | policy → suggestions + chosen action |
//! | ACT | safety gate, then dispatch with timeout + bounded retries |
//! | LOG | audit append (retry with backoff; poison action path on failure) |
//!
//! Entering ACT records the cooldown expiry regardless of outcome.
//! Disruptions arriving before expiry are coalesced: they skip analysis and
//! go straight to LOG with outcome `Suppressed`, preserving the trail.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::metrics::DetectionMetrics;
use crate::application::policy::{choose_action, rank_suggestions};
use crate::application::risk;
use crate::application::safety::{Authorization, SafetyGate};
use crate::domain::action::{Action, ActionDispatcher, ActionError};
use crate::domain::config::SessionConfig;
use crate::domain::disruption::{
    AuditOutcome, AuditRecord, Decision, DisruptionEvent, SessionState,
};
use crate::domain::events::EngineEvent;
use crate::domain::reasoning::{Assessment, Recommendation, ReasoningStrategy};
use crate::domain::route::{RouteId, Shipment, ShipmentId};
use crate::infrastructure::audit::{AuditError, AuditSink};
use crate::infrastructure::telemetry::TelemetryBus;
use aegis_sentinel_context::{ContextQuery, ContextStore, ScoredEntry};

const AUDIT_APPEND_ATTEMPTS: u32 = 3;
const AUDIT_BACKOFF_MS: u64 = 50;
const DISPATCH_BACKOFF_MS: u64 = 100;

/// Everything a session needs, shared across sessions.
#[derive(Clone)]
pub struct SessionDeps {
    pub context: Arc<dyn ContextStore>,
    pub reasoning: Arc<dyn ReasoningStrategy>,
    pub safety: Arc<SafetyGate>,
    pub dispatcher: Arc<dyn ActionDispatcher>,
    pub audit: Arc<dyn AuditSink>,
    pub telemetry: TelemetryBus,
    pub detection: Arc<DetectionMetrics>,
    pub shipments: Arc<dashmap::DashMap<ShipmentId, Shipment>>,
    /// Set when the audit trail is persistently failing; halts new action
    /// execution engine-wide (safety over availability).
    pub audit_poisoned: Arc<AtomicBool>,
}

pub struct DecisionSession {
    route_id: RouteId,
    config: SessionConfig,
    deps: SessionDeps,
    state: SessionState,
    cooldown_until: Option<DateTime<Utc>>,
    last_action_at: Option<DateTime<Utc>>,
    actions_taken: u64,
}

impl DecisionSession {
    pub fn new(route_id: RouteId, config: SessionConfig, deps: SessionDeps) -> Self {
        Self {
            route_id,
            config,
            deps,
            state: SessionState::Observe,
            cooldown_until: None,
            last_action_at: None,
            actions_taken: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn actions_taken(&self) -> u64 {
        self.actions_taken
    }

    pub fn last_action_at(&self) -> Option<DateTime<Utc>> {
        self.last_action_at
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    fn transition(&mut self, to: SessionState, event_id: Option<&crate::domain::event::EventId>) {
        self.deps.telemetry.publish(EngineEvent::SessionTransition {
            route_id: self.route_id,
            event_id: event_id.cloned(),
            from: self.state,
            to,
            timestamp: Utc::now(),
        });
        self.state = to;
    }

    /// Run one disruption through the cycle. Per-event errors are recovered
    /// here; only a dead audit trail escalates (by poisoning the action
    /// path), and even then the session keeps logging what it can.
    pub async fn handle(&mut self, disruption: DisruptionEvent) {
        let event_id = disruption.event.id.clone();
        let now = Utc::now();

        if self.in_cooldown(now) {
            self.suppress(disruption).await;
            return;
        }

        let mut trace: Vec<String> = Vec::new();

        // RETRIEVE
        self.transition(SessionState::Retrieve, Some(&event_id));
        let context = self.retrieve(&disruption).await;
        trace.push(format!("retrieve: {} context entries", context.len()));

        // ANALYZE
        self.transition(SessionState::Analyze, Some(&event_id));
        let shipment = self.most_impacted_shipment(&disruption);
        let assessment = self
            .analyze(&disruption, shipment.as_ref(), &context)
            .await;
        trace.push(format!(
            "analyze[{}]: {} (confidence {:.2})",
            assessment.strategy, assessment.text, assessment.confidence
        ));

        // DECIDE
        self.transition(SessionState::Decide, Some(&event_id));
        let suggestions = rank_suggestions(&disruption, shipment.as_ref());
        for suggestion in &suggestions {
            trace.push(format!(
                "suggest[{:.2}]: {}: {}",
                suggestion.confidence,
                suggestion.action.kind(),
                suggestion.rationale
            ));
        }
        let chosen = choose_action(&assessment, &disruption, shipment.as_ref());
        let decision = Decision {
            disruption_event_id: disruption.id,
            assessment: assessment.text.clone(),
            confidence: assessment.confidence,
            chosen_action: chosen,
        };
        self.deps.telemetry.publish(EngineEvent::DecisionMade {
            route_id: self.route_id,
            event_id: event_id.clone(),
            confidence: decision.confidence,
            action: decision.chosen_action.as_ref().map(|a| a.kind().to_string()),
            timestamp: Utc::now(),
        });

        // ACT: entering this state records the cooldown expiry regardless
        // of what happens next.
        self.transition(SessionState::Act, Some(&event_id));
        self.cooldown_until = Utc::now()
            .checked_add_signed(
                ChronoDuration::from_std(self.config.cooldown)
                    .unwrap_or_else(|_| ChronoDuration::minutes(10)),
            );
        let outcome = self.act(&decision, &event_id, &mut trace).await;

        // LOG
        self.transition(SessionState::Log, Some(&event_id));
        self.log(&disruption, Some(decision), outcome, trace).await;

        self.transition(SessionState::Observe, Some(&event_id));
    }

    /// Coalesced path: no retrieval, no analysis, still audited.
    async fn suppress(&mut self, disruption: DisruptionEvent) {
        let event_id = disruption.event.id.clone();
        let cooldown_until = self.cooldown_until.unwrap_or_else(Utc::now);

        debug!(
            route_id = %self.route_id,
            event_id = %event_id,
            "Disruption suppressed during cooldown"
        );
        metrics::counter!("sentinel_disruptions_suppressed").increment(1);

        self.deps.telemetry.publish(EngineEvent::DisruptionSuppressed {
            route_id: self.route_id,
            event_id: event_id.clone(),
            cooldown_until,
            timestamp: Utc::now(),
        });

        self.transition(SessionState::Log, Some(&event_id));
        self.log(
            &disruption,
            None,
            AuditOutcome::Suppressed,
            vec![format!("suppressed: cooldown until {cooldown_until}")],
        )
        .await;
        self.transition(SessionState::Observe, Some(&event_id));
    }

    async fn retrieve(&self, disruption: &DisruptionEvent) -> Vec<ScoredEntry> {
        let query = ContextQuery {
            anchor: disruption.event.summary.clone(),
            route_scope: Some(self.route_id.to_string()),
            time_window: ChronoDuration::from_std(self.config.context_window)
                .unwrap_or_else(|_| ChronoDuration::hours(24)),
            limit: self.config.context_limit,
        };

        match self.deps.context.query(query).await {
            Ok(entries) => entries,
            Err(e) => {
                // Retrieval failure degrades analysis, it never stops it.
                warn!(route_id = %self.route_id, "Context retrieval failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn analyze(
        &self,
        disruption: &DisruptionEvent,
        shipment: Option<&Shipment>,
        context: &[ScoredEntry],
    ) -> Assessment {
        match self
            .deps
            .reasoning
            .analyze(disruption, shipment, context)
            .await
        {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(
                    route_id = %self.route_id,
                    "Reasoning unavailable ({}); using threshold assessment",
                    e
                );
                // Degenerate assessment from the risk score alone. Cannot
                // clear the confidence gate, so it never causes an action.
                Assessment {
                    text: format!(
                        "Reasoning unavailable; risk score {:.0}/100",
                        disruption.risk_score
                    ),
                    confidence: 0.0,
                    recommendation: Recommendation::Advisory,
                    strategy: "unavailable".into(),
                }
            }
        }
    }

    /// The shipment the decision is anchored on: highest impact weight among
    /// those the disruption names that are still active.
    fn most_impacted_shipment(&self, disruption: &DisruptionEvent) -> Option<Shipment> {
        disruption
            .shipment_ids
            .iter()
            .filter_map(|id| self.deps.shipments.get(id).map(|s| s.clone()))
            .filter(|s| s.is_active())
            .max_by(|a, b| {
                risk::impact(a)
                    .partial_cmp(&risk::impact(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    async fn act(
        &mut self,
        decision: &Decision,
        event_id: &crate::domain::event::EventId,
        trace: &mut Vec<String>,
    ) -> AuditOutcome {
        let Some(action) = &decision.chosen_action else {
            trace.push("act: no action chosen".into());
            return AuditOutcome::NoAction;
        };

        if self.deps.audit_poisoned.load(Ordering::SeqCst) {
            trace.push("act: halted, audit trail unavailable".into());
            return AuditOutcome::Failed {
                reason: "action path halted: audit trail unavailable".into(),
            };
        }

        let session_key = self.route_id.to_string();
        match self
            .deps
            .safety
            .authorize(&session_key, action, decision.confidence)
        {
            Authorization::Blocked(reason) => {
                trace.push(format!("act: blocked ({reason:?})"));
                metrics::counter!("sentinel_actions_blocked").increment(1);
                AuditOutcome::Blocked { reason }
            }
            Authorization::Permitted => match self.dispatch_with_retries(action).await {
                Ok(()) => {
                    self.actions_taken += 1;
                    self.last_action_at = Some(Utc::now());
                    self.deps.detection.track_action(event_id);
                    trace.push(format!("act: executed {}", action.kind()));
                    AuditOutcome::Executed
                }
                Err(e) => {
                    warn!(route_id = %self.route_id, "Action failed permanently: {}", e);
                    metrics::counter!("sentinel_actions_failed").increment(1);
                    trace.push(format!("act: failed ({e})"));
                    AuditOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        }
    }

    /// Dispatch with a per-attempt timeout and a bounded retry budget. A
    /// timed-out action is a Failure, never left pending.
    async fn dispatch_with_retries(&self, action: &Action) -> Result<(), ActionError> {
        let attempts = self.config.action_retries + 1;
        let mut last_error = ActionError::Dispatch("no attempts made".into());

        for attempt in 0..attempts {
            match tokio::time::timeout(
                self.config.action_timeout,
                self.deps.dispatcher.execute(action),
            )
            .await
            {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => {
                    warn!(
                        kind = action.kind(),
                        attempt = attempt + 1,
                        "Action dispatch failed: {}",
                        e
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(kind = action.kind(), attempt = attempt + 1, "Action timed out");
                    last_error = ActionError::Timeout;
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(std::time::Duration::from_millis(
                    DISPATCH_BACKOFF_MS << attempt,
                ))
                .await;
            }
        }

        Err(last_error)
    }

    async fn log(
        &self,
        disruption: &DisruptionEvent,
        decision: Option<Decision>,
        outcome: AuditOutcome,
        trace: Vec<String>,
    ) {
        let record = AuditRecord::new(
            disruption.event.id.clone(),
            self.route_id,
            disruption.input_hash(),
            trace,
            decision,
            outcome.clone(),
        );

        match self.append_with_backoff(record).await {
            Ok(sequence) => {
                self.deps.telemetry.publish(EngineEvent::OutcomeRecorded {
                    route_id: self.route_id,
                    event_id: disruption.event.id.clone(),
                    outcome: outcome.as_str().to_string(),
                    audit_sequence: sequence,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                // The one failure class allowed to halt forward progress:
                // without a trail there is no explainability, so no new
                // actions execute until the sink recovers.
                self.deps.audit_poisoned.store(true, Ordering::SeqCst);
                error!(
                    route_id = %self.route_id,
                    "Audit append failed after retries, halting action execution: {}",
                    e
                );
            }
        }
    }

    async fn append_with_backoff(&self, record: AuditRecord) -> Result<u64, AuditError> {
        let mut last_error = AuditError::Io("no attempts made".into());

        for attempt in 0..AUDIT_APPEND_ATTEMPTS {
            match self.deps.audit.append(record.clone()).await {
                Ok(sequence) => {
                    if self.deps.audit_poisoned.swap(false, Ordering::SeqCst) {
                        info!(route_id = %self.route_id, "Audit trail recovered; actions resume");
                    }
                    return Ok(sequence);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, "Audit append failed: {}", e);
                    last_error = e;
                }
            }

            if attempt + 1 < AUDIT_APPEND_ATTEMPTS {
                tokio::time::sleep(std::time::Duration::from_millis(
                    AUDIT_BACKOFF_MS << attempt,
                ))
                .await;
            }
        }

        Err(last_error)
    }
}

/// Session task: serializes disruptions for one route until cancelled or the
/// queue closes. Cancellation lands between events, never mid-cycle, so an
/// in-flight audit append always completes.
pub async fn run_session(
    mut session: DecisionSession,
    mut rx: mpsc::Receiver<DisruptionEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(route_id = %session.route_id, "Session shutting down");
                return;
            }
            received = rx.recv() => {
                match received {
                    Some(disruption) => session.handle(disruption).await,
                    None => {
                        debug!(route_id = %session.route_id, "Session queue closed");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::SafetyConfig;
    use crate::domain::event::{Event, EventCategory, EventId, SourceKind};
    use crate::domain::route::CargoProfile;
    use crate::infrastructure::actions::LoggingDispatcher;
    use crate::infrastructure::audit::InMemoryAuditSink;
    use crate::infrastructure::strategies::RuleBasedStrategy;
    use aegis_sentinel_context::{
        HashingEmbedder, InMemoryEntryRepository, NoopEventSink, StandardContextStore,
    };
    use async_trait::async_trait;

    fn deps(dispatcher: Arc<dyn ActionDispatcher>) -> (SessionDeps, Arc<InMemoryAuditSink>) {
        let audit = Arc::new(InMemoryAuditSink::new());
        let context = StandardContextStore::new(
            Arc::new(InMemoryEntryRepository::new()),
            Arc::new(HashingEmbedder::default()),
            Arc::new(NoopEventSink),
        );
        let deps = SessionDeps {
            context: Arc::new(context),
            reasoning: Arc::new(RuleBasedStrategy::new()),
            safety: Arc::new(SafetyGate::new(&SafetyConfig::default())),
            dispatcher,
            audit: audit.clone(),
            telemetry: TelemetryBus::new(256),
            detection: Arc::new(DetectionMetrics::new()),
            shipments: Arc::new(dashmap::DashMap::new()),
            audit_poisoned: Arc::new(AtomicBool::new(false)),
        };
        (deps, audit)
    }

    fn disruption(route_id: RouteId, shipment_ids: Vec<ShipmentId>, risk: f64) -> DisruptionEvent {
        DisruptionEvent::new(
            Event {
                id: EventId(format!("evt-{}", uuid::Uuid::new_v4())),
                source_kind: SourceKind::News,
                category: EventCategory::CanalBlockage,
                location: None,
                location_name: Some("Suez Canal".into()),
                summary: "Canal blockage at Suez".into(),
                timestamp: Utc::now(),
                raw_severity: 9,
            },
            route_id,
            shipment_ids,
            risk,
        )
    }

    fn add_shipment(deps: &SessionDeps, route_id: RouteId, perishable: bool) -> ShipmentId {
        let id = ShipmentId("SHP_1001".into());
        deps.shipments.insert(
            id.clone(),
            Shipment::new(
                id.clone(),
                route_id,
                CargoProfile {
                    value_usd: 900_000.0,
                    perishable,
                },
            ),
        );
        id
    }

    #[tokio::test]
    async fn test_full_cycle_executes_and_audits() {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let (deps, audit) = deps(dispatcher.clone());
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps, route_id, true);

        let mut session = DecisionSession::new(route_id, SessionConfig::default(), deps);
        session
            .handle(disruption(route_id, vec![shipment_id], 90.0))
            .await;

        assert_eq!(session.state(), SessionState::Observe);
        assert_eq!(session.actions_taken(), 1);

        // High risk + perishable cargo: the reroute executed.
        let executed = dispatcher.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].kind(), "reroute");

        let records = audit.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::Executed);
        assert!(records[0].decision.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_second_disruption() {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let (deps, audit) = deps(dispatcher.clone());
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps, route_id, true);

        let mut session = DecisionSession::new(route_id, SessionConfig::default(), deps);
        session
            .handle(disruption(route_id, vec![shipment_id.clone()], 90.0))
            .await;
        session
            .handle(disruption(route_id, vec![shipment_id], 90.0))
            .await;

        // One executed action only; the repeat is audited as suppressed.
        assert_eq!(dispatcher.executed().len(), 1);
        let records = audit.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, AuditOutcome::Executed);
        assert_eq!(records[1].outcome, AuditOutcome::Suppressed);
        assert!(records[1].decision.is_none());
    }

    #[tokio::test]
    async fn test_advisory_risk_records_no_action_and_still_cools_down() {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let (deps, audit) = deps(dispatcher.clone());
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps, route_id, false);

        let mut session = DecisionSession::new(route_id, SessionConfig::default(), deps);
        session
            .handle(disruption(route_id, vec![shipment_id], 20.0))
            .await;

        assert!(dispatcher.executed().is_empty());
        assert!(session.in_cooldown(Utc::now()));

        let records = audit.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::NoAction);
    }

    struct LowConfidenceStrategy;

    #[async_trait]
    impl ReasoningStrategy for LowConfidenceStrategy {
        async fn analyze(
            &self,
            _disruption: &DisruptionEvent,
            _shipment: Option<&Shipment>,
            _context: &[ScoredEntry],
        ) -> Result<Assessment, crate::domain::reasoning::ReasoningError> {
            Ok(Assessment {
                text: "uncertain".into(),
                confidence: 0.55,
                recommendation: Recommendation::Critical,
                strategy: "stub".into(),
            })
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_low_confidence_is_blocked_but_audited() {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let (mut deps_, audit) = deps(dispatcher.clone());
        deps_.reasoning = Arc::new(LowConfidenceStrategy);
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps_, route_id, true);

        let mut session = DecisionSession::new(route_id, SessionConfig::default(), deps_);
        session
            .handle(disruption(route_id, vec![shipment_id], 90.0))
            .await;

        assert!(dispatcher.executed().is_empty());
        let records = audit.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outcome,
            AuditOutcome::Blocked {
                reason: crate::domain::disruption::BlockReason::LowConfidence
            }
        );
        // The decision itself is recorded with its sub-threshold confidence.
        let decision = records[0].decision.as_ref().unwrap();
        assert!(decision.confidence < 0.70);
        assert!(decision.chosen_action.is_some());
    }

    struct FailingDispatcher;

    #[async_trait]
    impl ActionDispatcher for FailingDispatcher {
        async fn execute(&self, _action: &Action) -> Result<(), ActionError> {
            Err(ActionError::Dispatch("downstream unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_bounded_and_audited() {
        let (deps, audit) = deps(Arc::new(FailingDispatcher));
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps, route_id, true);

        let mut config = SessionConfig::default();
        config.action_retries = 1;
        config.action_timeout = std::time::Duration::from_millis(500);

        let mut session = DecisionSession::new(route_id, config, deps);
        session
            .handle(disruption(route_id, vec![shipment_id], 90.0))
            .await;

        let records = audit.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0].outcome, AuditOutcome::Failed { .. }));
        assert_eq!(session.actions_taken(), 0);
    }

    struct BrokenAuditSink;

    #[async_trait]
    impl AuditSink for BrokenAuditSink {
        async fn append(&self, _record: AuditRecord) -> Result<u64, AuditError> {
            Err(AuditError::Io("disk full".into()))
        }

        async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_audit_failure_poisons_action_path() {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let (mut deps_, _unused) = deps(dispatcher.clone());
        deps_.audit = Arc::new(BrokenAuditSink);
        let route_id = RouteId::new();
        let shipment_id = add_shipment(&deps_, route_id, true);
        let poisoned = deps_.audit_poisoned.clone();

        let mut config = SessionConfig::default();
        config.cooldown = std::time::Duration::from_millis(0);

        let mut session = DecisionSession::new(route_id, config, deps_);
        session
            .handle(disruption(route_id, vec![shipment_id.clone()], 90.0))
            .await;

        assert!(poisoned.load(Ordering::SeqCst));

        // The next disruption must not execute anything while poisoned.
        session
            .handle(disruption(route_id, vec![shipment_id], 90.0))
            .await;
        assert_eq!(dispatcher.executed().len(), 1);
    }
}
