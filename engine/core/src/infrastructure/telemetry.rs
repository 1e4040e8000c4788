// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Telemetry Bus - Pub/Sub for Engine Events
//
// In-memory event streaming using tokio broadcast channels, plus an optional
// TCP forwarder that pushes JSON lines to external observers. Delivery is
// best-effort: a slow subscriber lags and loses events; publishing never
// blocks the decision path.

use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::events::EngineEvent;

/// Telemetry bus for publishing and subscribing to engine events
#[derive(Clone)]
pub struct TelemetryBus {
    sender: Arc<broadcast::Sender<EngineEvent>>,
}

impl TelemetryBus {
    /// Create a new bus with the given channel capacity. Capacity bounds how
    /// many events a slow subscriber can fall behind before losing some.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers. Never blocks; with no
    /// subscribers the event is simply dropped.
    pub fn publish(&self, event: EngineEvent) {
        debug!(event_type = event.event_type(), "Publishing engine event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> TelemetryReceiver {
        TelemetryReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct TelemetryReceiver {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl TelemetryReceiver {
    pub async fn recv(&mut self) -> Result<EngineEvent, TelemetryError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => TelemetryError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Telemetry receiver lagged by {} events", n);
                TelemetryError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<EngineEvent, TelemetryError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => TelemetryError::Empty,
            broadcast::error::TryRecvError::Closed => TelemetryError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => TelemetryError::Lagged(n),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Telemetry bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

/// Streams engine events as JSON lines to TCP clients. Every connected
/// client gets its own subscription; a lagging client skips the lost events
/// and keeps going rather than applying backpressure to the engine.
pub struct TelemetryForwarder;

impl TelemetryForwarder {
    /// Bind `addr` and serve until the token is cancelled.
    pub async fn start(
        addr: String,
        bus: TelemetryBus,
        shutdown: CancellationToken,
    ) -> std::io::Result<tokio::task::JoinHandle<()>> {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "Telemetry forwarder listening");

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                debug!(%peer, "Telemetry client connected");
                                let receiver = bus.subscribe();
                                let client_shutdown = shutdown.clone();
                                tokio::spawn(Self::serve_client(stream, receiver, client_shutdown));
                            }
                            Err(e) => {
                                warn!("Telemetry accept failed: {}", e);
                            }
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Telemetry forwarder shutting down");
                        return;
                    }
                }
            }
        }))
    }

    async fn serve_client(
        mut stream: tokio::net::TcpStream,
        mut receiver: TelemetryReceiver,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                event = receiver.recv() => {
                    let event = match event {
                        Ok(event) => event,
                        // Lagging is survivable; resume from the live edge.
                        Err(TelemetryError::Lagged(_)) => continue,
                        Err(_) => return,
                    };

                    let Ok(mut line) = serde_json::to_string(&event) else {
                        continue;
                    };
                    line.push('\n');

                    if stream.write_all(line.as_bytes()).await.is_err() {
                        debug!("Telemetry client disconnected");
                        return;
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::RouteId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = TelemetryBus::new(16);
        let mut receiver = bus.subscribe();

        let route_id = RouteId::new();
        bus.publish(EngineEvent::RouteActivated {
            route_id,
            waypoint_count: 12,
            corridor_radius_km: 200.0,
            timestamp: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            EngineEvent::RouteActivated { route_id: id, .. } => assert_eq!(id, route_id),
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_block() {
        let bus = TelemetryBus::new(1);
        for _ in 0..100 {
            bus.publish(EngineEvent::RouteDeactivated {
                route_id: RouteId::new(),
                timestamp: Utc::now(),
            });
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = TelemetryBus::new(16);
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(EngineEvent::RouteDeactivated {
            route_id: RouteId::new(),
            timestamp: Utc::now(),
        });

        assert!(r1.recv().await.is_ok());
        assert!(r2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_forwarder_streams_json_lines() {
        use tokio::io::AsyncBufReadExt;

        let bus = TelemetryBus::new(16);
        let shutdown = CancellationToken::new();
        // Grab a free port from the OS, then hand it to the forwarder.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let _handle = TelemetryForwarder::start(addr.to_string(), bus.clone(), shutdown.clone())
            .await
            .expect("bind");

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        // Give the accept loop a beat to register the subscription.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        bus.publish(EngineEvent::RouteDeactivated {
            route_id: RouteId::new(),
            timestamp: Utc::now(),
        });

        let mut reader = tokio::io::BufReader::new(stream);
        let mut line = String::new();
        tokio::time::timeout(std::time::Duration::from_secs(2), reader.read_line(&mut line))
            .await
            .expect("line within timeout")
            .expect("read ok");

        assert!(line.contains("route_deactivated"));
        shutdown.cancel();
    }
}
