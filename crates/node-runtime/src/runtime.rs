//! Node construction and lifecycle.

use crate::adapters::{FileCertificateStore, InMemoryEventStore};
use crate::config::NodeConfig;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use courier_delivery::{DeliveryCoordinator, EventSource};
use courier_gateway::{ListenerAddrs, ListenerSupervisor};
use courier_trust::TrustManager;
use std::sync::Arc;
use tracing::{info, warn};

/// The wired Courier node.
pub struct NodeRuntime {
    supervisor: Arc<ListenerSupervisor>,
    coordinator: Arc<DeliveryCoordinator>,
    event_store: Arc<InMemoryEventStore>,
}

impl NodeRuntime {
    /// Wire all subsystems from configuration.
    ///
    /// Fails if the TLS identity or peer CA bundle cannot be loaded — the
    /// node must not come up without a valid peer-facing trust context.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let cert_store = Arc::new(FileCertificateStore::new(&config.identity));
        let trust =
            Arc::new(TrustManager::new(cert_store).context("loading TLS trust material")?);

        let event_store = Arc::new(InMemoryEventStore::new());
        let coordinator = Arc::new(DeliveryCoordinator::new(
            Arc::clone(&event_store) as Arc<dyn EventSource>
        ));
        event_store.subscribe(Arc::clone(&coordinator));

        if config.gateway.api_key.is_none() {
            warn!(
                "no shared secret configured; control API and delegate upgrades \
                 accept any caller (permissive mode)"
            );
        }

        let supervisor = Arc::new(
            ListenerSupervisor::new(
                config.gateway,
                trust,
                Arc::clone(&coordinator),
                control_app_routes(),
                peer_app_routes(),
            )
            .context("building listener supervisor")?,
        );

        Ok(Self {
            supervisor,
            coordinator,
            event_store,
        })
    }

    /// Start both listeners; resolves once both are accepting.
    pub async fn start(&self) -> Result<ListenerAddrs> {
        info!("===========================================");
        info!("  Courier Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let addrs = self
            .supervisor
            .start()
            .await
            .context("starting listeners")?;
        info!(control = %addrs.control, peer = %addrs.peer, "courier node started");
        Ok(addrs)
    }

    /// Close all network surfaces, bounded by the shutdown deadline.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }

    /// The durable event store (publish side).
    pub fn event_store(&self) -> Arc<InMemoryEventStore> {
        Arc::clone(&self.event_store)
    }

    /// The delivery coordinator.
    pub fn coordinator(&self) -> Arc<DeliveryCoordinator> {
        Arc::clone(&self.coordinator)
    }
}

/// Application routes on the control listener.
///
/// Transfer business routes plug in here; the runtime ships the
/// documentation stub the root path redirects to.
fn control_app_routes() -> Router {
    Router::new().route(
        "/docs",
        get(|| async {
            Json(serde_json::json!({
                "service": "courier-node",
                "version": env!("CARGO_PKG_VERSION"),
                "endpoints": {
                    "GET /health": "liveness probe",
                    "GET /status": "delivery coordinator occupancy",
                    "POST /trust/refresh": "reload peer CAs and swap the TLS context",
                    "GET /delegate": "upgrade to the delegate event stream",
                },
            }))
        }),
    )
}

/// Application routes on the peer listener, nested under `/v1`.
fn peer_app_routes() -> Router {
    Router::new().route(
        "/health",
        get(|| async {
            Json(serde_json::json!({
                "status": "healthy",
                "service": "courier-node",
            }))
        }),
    )
}
