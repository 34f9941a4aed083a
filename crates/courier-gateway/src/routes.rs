//! Router builders for both listeners.

use crate::config::GatewayConfig;
use crate::gate::{ApiKeyGateLayer, GateConfig};
use crate::upgrade::{self, SessionRegistry};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use courier_delivery::DeliveryCoordinator;
use courier_trust::TrustManager;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// State shared by the control listener's handlers.
#[derive(Clone)]
pub struct ControlState {
    pub coordinator: Arc<DeliveryCoordinator>,
    pub trust: Arc<TrustManager>,
    pub sessions: Arc<SessionRegistry>,
    pub shutdown: watch::Receiver<bool>,
}

/// Build the control listener's router.
///
/// Built-in routes plus the application's control routes, behind the access
/// gate and a request-body bound. The root path redirects to the
/// documentation path; documentation is served by the application router.
pub fn control_router(state: ControlState, app_routes: Router, config: &GatewayConfig) -> Router {
    let gate = ApiKeyGateLayer::new(GateConfig {
        api_key: config.api_key.clone(),
        exempt_paths: vec!["/".to_string(), config.docs_path.clone()],
    });

    let docs_path = config.docs_path.clone();
    let docs_redirect = move || {
        let target = docs_path.clone();
        async move { Redirect::temporary(&target) }
    };

    Router::new()
        .route("/", get(docs_redirect))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/trust/refresh", post(refresh_trust))
        .route("/delegate", get(upgrade::delegate_upgrade))
        .with_state(state)
        .merge(app_routes)
        .layer(gate)
        .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Build the peer listener's router: application routes under the versioned
/// prefix. Admission happened at the TLS handshake; no gate here.
pub fn peer_router(app_routes: Router) -> Router {
    Router::new()
        .nest("/v1", app_routes)
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "courier-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Delivery coordinator occupancy.
async fn status(State(state): State<ControlState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "delivery": state.coordinator.stats().await,
        "delegate_sessions": state.sessions.active(),
    }))
}

/// Reload peer CAs and swap the peer listener's TLS context.
async fn refresh_trust(State(state): State<ControlState>) -> Response {
    let trust = Arc::clone(&state.trust);
    match tokio::task::spawn_blocking(move || trust.refresh()).await {
        Ok(Ok(())) => (StatusCode::OK, Json(serde_json::json!({"refreshed": true}))).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "trust refresh failed; previous context retained");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "trust refresh task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "refresh task failed"})),
            )
                .into_response()
        }
    }
}
