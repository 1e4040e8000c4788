// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SentinelEngine — route lifecycle and the ingest path
//!
//! Event-driven: the engine is idle until a raw record arrives or a route is
//! activated; no polling loop drives business logic. Each activated route
//! gets a corridor registration and a dedicated session task behind a
//! bounded queue (a full queue blocks the producer; pressure is surfaced,
//! never silently dropped). Deactivation cancels the session and removes the
//! corridor entry; already-appended audit records are untouched.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::metrics::DetectionMetrics;
use crate::application::normalizer::EventNormalizer;
use crate::application::risk;
use crate::application::safety::SafetyGate;
use crate::application::session::{run_session, DecisionSession, SessionDeps};
use crate::domain::action::ActionDispatcher;
use crate::domain::config::{
    ActionMode, ConfigError, EmbeddingProvider, EngineConfig, RoutingProvider,
};
use crate::domain::disruption::DisruptionEvent;
use crate::domain::event::{Event, RawRecord, RejectReason};
use crate::domain::events::EngineEvent;
use crate::domain::geo::GeoPoint;
use crate::domain::reasoning::ReasoningStrategy;
use crate::domain::route::{Route, RouteId, Shipment, ShipmentId};
use crate::infrastructure::actions::{LoggingDispatcher, WebhookDispatcher};
use crate::infrastructure::audit::{AuditSink, InMemoryAuditSink, JsonlAuditSink};
use crate::infrastructure::corridor::{CorridorError, CorridorIndex};
use crate::infrastructure::strategies::StrategyRouter;
use crate::infrastructure::routing::{
    GreatCirclePlanner, OsrmRoutePlanner, RoutePlanError, RoutePlanner,
};
use crate::infrastructure::telemetry::TelemetryBus;
use aegis_sentinel_context::{
    ContextPruner, ContextPrunerConfig, ContextStore, Embedder, HashingEmbedder, HttpEmbedder,
    InMemoryEntryRepository, NewEntry, NoopEventSink, StandardContextStore,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Corridor(#[from] CorridorError),

    #[error(transparent)]
    RoutePlan(#[from] RoutePlanError),
}

/// What happened to one ingested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Normalization rejected the record (counted, engine continues).
    Rejected(RejectReason),
    /// Normalized, indexed, but inside no registered corridor.
    NoCorridorMatch,
    /// Dispatched to this many route sessions.
    Dispatched { routes: usize },
}

/// Collaborators the engine is wired with. Built by [`SentinelEngine::from_config`]
/// for production shapes; tests inject fakes directly.
pub struct EngineDeps {
    pub context: Arc<dyn ContextStore>,
    pub reasoning: Arc<dyn ReasoningStrategy>,
    pub dispatcher: Arc<dyn ActionDispatcher>,
    pub audit: Arc<dyn AuditSink>,
    pub planner: Arc<dyn RoutePlanner>,
}

struct SessionHandle {
    tx: mpsc::Sender<DisruptionEvent>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

pub struct SentinelEngine {
    config: EngineConfig,
    normalizer: EventNormalizer,
    corridor: CorridorIndex,
    safety: Arc<SafetyGate>,
    telemetry: TelemetryBus,
    detection: Arc<DetectionMetrics>,
    shipments: Arc<DashMap<ShipmentId, Shipment>>,
    sessions: DashMap<RouteId, SessionHandle>,
    deps: EngineDeps,
    audit_poisoned: Arc<AtomicBool>,
    shutdown: CancellationToken,
    /// Retention pruner for the context store; present in production wiring.
    pruner: Option<Arc<ContextPruner>>,
}

impl SentinelEngine {
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let normalizer = EventNormalizer::new(&config.normalizer);
        let safety = Arc::new(SafetyGate::new(&config.safety));
        let telemetry = TelemetryBus::new(config.telemetry.capacity);

        Self {
            config,
            normalizer,
            corridor: CorridorIndex::new(),
            safety,
            telemetry,
            detection: Arc::new(DetectionMetrics::new()),
            shipments: Arc::new(DashMap::new()),
            sessions: DashMap::new(),
            deps,
            audit_poisoned: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
            pruner: None,
        }
    }

    /// Wire the production collaborators described by the configuration:
    /// context store with the configured embedder, reasoning router with
    /// rule-based fallback, webhook or logging dispatcher, JSONL or
    /// in-memory audit sink, OSRM or great-circle planner.
    pub async fn from_config(config: EngineConfig) -> anyhow::Result<Self> {
        let embedder: Arc<dyn Embedder> = match config.context.embedding.provider {
            EmbeddingProvider::Http => {
                let api_key =
                    crate::domain::config::resolve_secret(&config.context.embedding.api_key)?
                        .unwrap_or_default();
                Arc::new(HttpEmbedder::new(
                    config.context.embedding.endpoint.clone(),
                    api_key,
                    config.context.embedding.model.clone(),
                    config.context.embedding.dimensions,
                ))
            }
            EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::default()),
        };

        let retention = chrono::Duration::from_std(config.context.retention)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        let context = Arc::new(
            StandardContextStore::new(
                Arc::new(InMemoryEntryRepository::new()),
                embedder,
                Arc::new(NoopEventSink),
            )
            .with_retention_horizon(retention),
        );

        let reasoning = Arc::new(StrategyRouter::from_config(&config.reasoning)?);

        let dispatcher: Arc<dyn ActionDispatcher> = match config.actions.mode {
            ActionMode::Webhook => {
                let url = config.actions.webhook_url.clone().ok_or(ConfigError::Invalid(
                    "actions.webhook_url required for webhook mode".into(),
                ))?;
                Arc::new(WebhookDispatcher::new(url))
            }
            ActionMode::Logging => Arc::new(LoggingDispatcher::new()),
        };

        let audit: Arc<dyn AuditSink> = match &config.audit.path {
            Some(path) => Arc::new(JsonlAuditSink::open(path.clone()).await?),
            None => Arc::new(InMemoryAuditSink::new()),
        };

        let planner: Arc<dyn RoutePlanner> = match config.routing.provider {
            RoutingProvider::Osrm => Arc::new(OsrmRoutePlanner::new(
                config.routing.endpoint.clone(),
                config.routing.request_timeout,
            )),
            RoutingProvider::GreatCircle => Arc::new(GreatCirclePlanner::default()),
        };

        let mut engine = Self::new(
            config,
            EngineDeps {
                context: context.clone(),
                reasoning,
                dispatcher,
                audit,
                planner,
            },
        );

        // Background retention enforcement; queries only ever see the
        // logical horizon, this reclaims the memory behind it.
        let pruner = Arc::new(ContextPruner::new(context, ContextPrunerConfig::default()));
        let _ = pruner.clone().start();
        engine.pruner = Some(pruner);

        Ok(engine)
    }

    pub fn telemetry(&self) -> &TelemetryBus {
        &self.telemetry
    }

    pub fn context(&self) -> &Arc<dyn ContextStore> {
        &self.deps.context
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.deps.audit
    }

    pub fn detection_metrics(&self) -> &Arc<DetectionMetrics> {
        &self.detection
    }

    pub fn normalizer(&self) -> &EventNormalizer {
        &self.normalizer
    }

    pub fn active_routes(&self) -> usize {
        self.sessions.len()
    }

    /// The registered polyline and corridor radius for an active route.
    pub fn route(&self, route_id: RouteId) -> Option<Route> {
        self.corridor.route(route_id)
    }

    fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            context: self.deps.context.clone(),
            reasoning: self.deps.reasoning.clone(),
            safety: self.safety.clone(),
            dispatcher: self.deps.dispatcher.clone(),
            audit: self.deps.audit.clone(),
            telemetry: self.telemetry.clone(),
            detection: self.detection.clone(),
            shipments: self.shipments.clone(),
            audit_poisoned: self.audit_poisoned.clone(),
        }
    }

    /// Activate monitoring between two coordinates: plan the polyline,
    /// register the corridor, spawn the session.
    pub async fn activate_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        corridor_radius_km: f64,
    ) -> Result<RouteId, EngineError> {
        let polyline = self.deps.planner.plan(origin, destination).await?;
        let waypoint_count = polyline.len();
        let route = Route::new(polyline, corridor_radius_km);
        let route_id = self.corridor.register(route)?;

        let (tx, rx) = mpsc::channel(self.config.session.queue_depth.max(1));
        let session_shutdown = self.shutdown.child_token();
        let session = DecisionSession::new(
            route_id,
            self.config.session.clone(),
            self.session_deps(),
        );
        let task = tokio::spawn(run_session(session, rx, session_shutdown.clone()));

        self.sessions.insert(
            route_id,
            SessionHandle {
                tx,
                shutdown: session_shutdown,
                task,
            },
        );

        info!(%route_id, waypoint_count, corridor_radius_km, "Route activated");
        self.telemetry.publish(EngineEvent::RouteActivated {
            route_id,
            waypoint_count,
            corridor_radius_km,
            timestamp: Utc::now(),
        });

        Ok(route_id)
    }

    /// Stop monitoring a route. Tears down the session and the corridor
    /// registration; the audit trail keeps every record already appended.
    pub async fn deactivate_route(&self, route_id: RouteId) -> Result<(), EngineError> {
        let (_, handle) = self
            .sessions
            .remove(&route_id)
            .ok_or(CorridorError::UnknownRoute(route_id))?;

        handle.shutdown.cancel();
        drop(handle.tx);
        // Let the session finish its in-flight cycle; audit writes complete.
        let _ = handle.task.await;

        self.corridor.unregister(route_id)?;

        info!(%route_id, "Route deactivated");
        self.telemetry.publish(EngineEvent::RouteDeactivated {
            route_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Create or update a shipment. Position updates mutate progress;
    /// delivery/cancellation is a status change followed by retirement.
    pub fn upsert_shipment(&self, shipment: Shipment) {
        self.shipments.insert(shipment.id.clone(), shipment);
    }

    pub fn retire_shipment(&self, shipment_id: &ShipmentId) -> Option<Shipment> {
        self.shipments.remove(shipment_id).map(|(_, s)| s)
    }

    /// The ingest path: normalize → index → corridor match → score →
    /// dispatch to each affected route's session. Rejections are returned,
    /// not raised; the engine never crashes on a bad record.
    pub async fn ingest(&self, raw: RawRecord) -> IngestOutcome {
        let event = match self.normalizer.normalize(raw) {
            Ok(event) => event,
            Err(reason) => return IngestOutcome::Rejected(reason),
        };

        self.detection.track_detection(&event.id, event.timestamp);

        // Feed the living index; every normalized event is retrievable
        // context for future analyses, disruption or not.
        if let Err(e) = self
            .deps
            .context
            .index(NewEntry {
                route_scope: None,
                category: event.category.as_str().to_string(),
                location: event.location_name.clone(),
                text: event.summary.clone(),
                occurred_at: event.timestamp,
            })
            .await
        {
            warn!("Context indexing failed: {}", e);
        }

        let Some(point) = event.location else {
            return IngestOutcome::NoCorridorMatch;
        };

        let affected = self.corridor.affected_routes(point);
        if affected.is_empty() {
            return IngestOutcome::NoCorridorMatch;
        }

        let mut dispatched = 0usize;
        for route_id in affected {
            let disruption = self.derive_disruption(&event, route_id);

            self.telemetry.publish(EngineEvent::DisruptionDetected {
                route_id,
                event_id: event.id.clone(),
                risk_score: disruption.risk_score,
                shipment_ids: disruption.shipment_ids.clone(),
                timestamp: Utc::now(),
            });

            if let Some(handle) = self.sessions.get(&route_id) {
                // Bounded queue; a full session blocks this producer rather
                // than dropping or growing without bound.
                if handle.tx.send(disruption).await.is_err() {
                    warn!(%route_id, "Session queue closed, disruption dropped");
                    continue;
                }
                dispatched += 1;
            }
        }

        IngestOutcome::Dispatched { routes: dispatched }
    }

    /// Score the event against the shipments currently on the route. With no
    /// active shipments the impact weight is unknown; a neutral 0.5 keeps
    /// the disruption visible without inflating it.
    fn derive_disruption(&self, event: &Event, route_id: RouteId) -> DisruptionEvent {
        let severity = risk::severity(event);

        let mut shipment_ids = Vec::new();
        let mut max_risk: Option<f64> = None;
        for entry in self.shipments.iter() {
            let shipment = entry.value();
            if shipment.route_id == route_id && shipment.is_active() {
                let score = risk::score(event, shipment);
                max_risk = Some(max_risk.map_or(score, |r| r.max(score)));
                shipment_ids.push(shipment.id.clone());
            }
        }

        let risk_score = max_risk.unwrap_or_else(|| risk::score_parts(severity, 0.5));
        DisruptionEvent::new(event.clone(), route_id, shipment_ids, risk_score)
    }

    /// Cancel every session. Queued-but-unprocessed disruptions are dropped;
    /// appended audit records are not.
    pub async fn shutdown(&self) {
        info!("Engine shutting down");
        self.shutdown.cancel();
        if let Some(pruner) = &self.pruner {
            pruner.shutdown_token().cancel();
        }

        let route_ids: Vec<RouteId> = self.sessions.iter().map(|e| *e.key()).collect();
        let mut tasks = Vec::new();
        for route_id in route_ids {
            if let Some((_, handle)) = self.sessions.remove(&route_id) {
                drop(handle.tx);
                tasks.push(handle.task);
            }
        }
        let _ = futures::future::join_all(tasks).await;
    }
}
