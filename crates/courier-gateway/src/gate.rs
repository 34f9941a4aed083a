//! Access control gate for the control listener.
//!
//! Admission is a shared-secret check on the `x-api-key` header, applied
//! identically to control-API requests and delegate-upgrade requests. The
//! peer listener never consults this gate; its trust model is mutual TLS.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Gate configuration.
#[derive(Clone, Default)]
pub struct GateConfig {
    /// Shared secret; `None` authorizes everything (permissive mode).
    pub api_key: Option<String>,
    /// Paths admitted without a key (the documentation path and the root
    /// redirect that points at it).
    pub exempt_paths: Vec<String>,
}

/// Access gate layer.
#[derive(Clone)]
pub struct ApiKeyGateLayer {
    config: Arc<GateConfig>,
}

impl ApiKeyGateLayer {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for ApiKeyGateLayer {
    type Service = ApiKeyGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyGate {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Access gate service.
#[derive(Clone)]
pub struct ApiKeyGate<S> {
    inner: S,
    config: Arc<GateConfig>,
}

impl<S> Service<Request<Body>> for ApiKeyGate<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if authorize(&config, req.uri().path(), req.headers()) {
                inner.call(req).await
            } else {
                warn!(path = req.uri().path(), "request failed access check");
                Ok(unauthorized_response())
            }
        })
    }
}

/// Decide whether a request may pass the gate.
///
/// Exempt paths (and their subpaths) always pass. With no key configured
/// everything passes. Otherwise the presented `x-api-key` must match the
/// secret exactly; a missing header is a mismatch.
pub fn authorize(config: &GateConfig, path: &str, headers: &HeaderMap) -> bool {
    if config
        .exempt_paths
        .iter()
        .any(|p| path == p || (p != "/" && path.starts_with(&format!("{p}/"))))
    {
        return true;
    }

    let Some(expected) = &config.api_key else {
        return true;
    };

    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(presented) => constant_time_compare(presented, expected),
        None => false,
    }
}

/// Constant-time string comparison.
///
/// The comparison must not leak how many leading characters match.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        // Equalize work for mismatched lengths before rejecting.
        let _ = a.as_bytes().ct_eq(a.as_bytes());
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create the unauthorized rejection response.
fn unauthorized_response() -> Response {
    let body = serde_json::json!({
        "error": "unauthorized",
        "message": "missing or invalid x-api-key"
    });

    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(key).unwrap());
        headers
    }

    fn gate(api_key: Option<&str>) -> GateConfig {
        GateConfig {
            api_key: api_key.map(String::from),
            exempt_paths: vec!["/".to_string(), "/docs".to_string()],
        }
    }

    #[test]
    fn test_no_key_configured_authorizes_everything() {
        let config = gate(None);
        assert!(authorize(&config, "/status", &HeaderMap::new()));
        assert!(authorize(&config, "/delegate", &HeaderMap::new()));
    }

    #[test]
    fn test_matching_key_authorized() {
        let config = gate(Some("sesame"));
        assert!(authorize(&config, "/status", &headers_with_key("sesame")));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let config = gate(Some("sesame"));
        assert!(!authorize(&config, "/status", &headers_with_key("Sesame")));
        assert!(!authorize(&config, "/status", &headers_with_key("sesam")));
        assert!(!authorize(&config, "/status", &headers_with_key("sesame2")));
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = gate(Some("sesame"));
        assert!(!authorize(&config, "/status", &HeaderMap::new()));
    }

    #[test]
    fn test_docs_path_exempt() {
        let config = gate(Some("sesame"));
        assert!(authorize(&config, "/docs", &HeaderMap::new()));
        assert!(authorize(&config, "/docs/openapi.json", &HeaderMap::new()));
        assert!(authorize(&config, "/", &HeaderMap::new()));
        // Exemption is per-path, not per-prefix of the root.
        assert!(!authorize(&config, "/docsish", &HeaderMap::new()));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "Secret"));
        assert!(!constant_time_compare("secret", "secre"));
        assert!(!constant_time_compare("secret", "secrets"));
        assert!(constant_time_compare("", ""));
    }
}
