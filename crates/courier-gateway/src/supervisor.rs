//! Listener supervisor: start/stop of both listeners and delegate sessions.

use crate::config::GatewayConfig;
use crate::routes::{self, ControlState};
use crate::upgrade::SessionRegistry;
use crate::GatewayError;
use axum::Router;
use courier_delivery::DeliveryCoordinator;
use courier_trust::TrustManager;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::util::ServiceExt;
use tracing::{debug, error, info, warn};

/// Bound addresses reported once both listeners are ready to accept.
#[derive(Debug, Clone, Copy)]
pub struct ListenerAddrs {
    pub control: SocketAddr,
    pub peer: SocketAddr,
}

/// One network surface owned by the supervisor.
struct Surface {
    name: &'static str,
    handle: JoinHandle<Result<(), GatewayError>>,
}

/// Owns the node's network surfaces:
///
/// 1. the internal control listener (plain TCP),
/// 2. the external peer listener (mutual TLS via the trust manager),
/// 3. the delegate sessions accepted through the control listener.
///
/// [`ListenerSupervisor::start`] resolves once both sockets are bound.
/// [`ListenerSupervisor::stop`] signals all surfaces concurrently and waits
/// for each under the configured deadline; a surface that never confirms is
/// force-terminated so shutdown cannot hang.
pub struct ListenerSupervisor {
    config: GatewayConfig,
    trust: Arc<TrustManager>,
    coordinator: Arc<DeliveryCoordinator>,
    control_app: Router,
    peer_app: Router,
    sessions: Arc<SessionRegistry>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    surfaces: parking_lot::Mutex<Vec<Surface>>,
}

impl ListenerSupervisor {
    /// Create a supervisor around the given collaborators.
    ///
    /// `control_app` carries the application's control-API routes
    /// (documentation included); `peer_app` the peer routes nested under the
    /// versioned prefix.
    pub fn new(
        config: GatewayConfig,
        trust: Arc<TrustManager>,
        coordinator: Arc<DeliveryCoordinator>,
        control_app: Router,
        peer_app: Router,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            trust,
            coordinator,
            control_app,
            peer_app,
            sessions: Arc::new(SessionRegistry::new()),
            shutdown_tx,
            shutdown_rx,
            surfaces: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Bind both listeners and start serving.
    ///
    /// Returns the bound addresses once both sockets accept connections.
    /// Binding failure aborts startup.
    pub async fn start(&self) -> Result<ListenerAddrs, GatewayError> {
        if !self.surfaces.lock().is_empty() {
            return Err(GatewayError::Config("supervisor already started".into()));
        }

        let state = ControlState {
            coordinator: Arc::clone(&self.coordinator),
            trust: Arc::clone(&self.trust),
            sessions: Arc::clone(&self.sessions),
            shutdown: self.shutdown_rx.clone(),
        };
        let control_router = routes::control_router(state, self.control_app.clone(), &self.config);
        let peer_router = routes::peer_router(self.peer_app.clone());

        let control_listener = TcpListener::bind(self.config.control_addr())
            .await
            .map_err(|source| GatewayError::Bind {
                surface: "control",
                source,
            })?;
        let peer_listener = TcpListener::bind(self.config.peer_addr())
            .await
            .map_err(|source| GatewayError::Bind {
                surface: "peer",
                source,
            })?;

        let addrs = ListenerAddrs {
            control: control_listener.local_addr().map_err(|source| {
                GatewayError::Bind {
                    surface: "control",
                    source,
                }
            })?,
            peer: peer_listener.local_addr().map_err(|source| GatewayError::Bind {
                surface: "peer",
                source,
            })?,
        };
        info!(addr = %addrs.control, "control listener ready");
        info!(addr = %addrs.peer, "peer listener ready");

        let control_handle = {
            let mut shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move {
                axum::serve(control_listener, control_router.into_make_service())
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.changed().await;
                    })
                    .await
                    .map_err(|source| GatewayError::Serve {
                        surface: "control",
                        source,
                    })
            })
        };

        let peer_handle = {
            let trust = Arc::clone(&self.trust);
            let shutdown = self.shutdown_rx.clone();
            tokio::spawn(serve_peer(peer_listener, trust, peer_router, shutdown))
        };

        let sessions_handle = {
            let sessions = Arc::clone(&self.sessions);
            let mut shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move {
                let _ = shutdown.changed().await;
                sessions.drained().await;
                Ok(())
            })
        };

        *self.surfaces.lock() = vec![
            Surface {
                name: "control",
                handle: control_handle,
            },
            Surface {
                name: "peer",
                handle: peer_handle,
            },
            Surface {
                name: "delegate-sessions",
                handle: sessions_handle,
            },
        ];

        Ok(addrs)
    }

    /// Close all surfaces, bounded by the configured deadline per surface.
    pub async fn stop(&self) {
        info!("stopping network surfaces");
        let _ = self.shutdown_tx.send(true);

        let surfaces: Vec<Surface> = self.surfaces.lock().drain(..).collect();
        let deadline = self.config.shutdown_deadline();
        futures::future::join_all(
            surfaces
                .into_iter()
                .map(|surface| close_surface(surface, deadline)),
        )
        .await;

        info!("all network surfaces closed");
    }

    /// Reload peer CAs and swap the peer listener's TLS context.
    ///
    /// The next handshake observes the new trust set; established
    /// connections are untouched.
    pub fn refresh_trust(&self) -> Result<(), GatewayError> {
        self.trust.refresh().map_err(Into::into)
    }

    /// Number of live delegate sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.active()
    }
}

/// Wait for one surface to confirm closure, forcing termination on deadline.
async fn close_surface(surface: Surface, deadline: Duration) {
    let Surface { name, mut handle } = surface;
    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(Ok(()))) => info!(surface = name, "surface closed"),
        Ok(Ok(Err(e))) => error!(surface = name, error = %e, "surface closed with error"),
        Ok(Err(e)) => error!(surface = name, error = %e, "surface task failed"),
        Err(_) => {
            handle.abort();
            warn!(
                surface = name,
                "close deadline exceeded; surface force-terminated"
            );
        }
    }
}

/// Accept loop for the mutual-TLS peer listener.
///
/// Every accepted connection handshakes against a snapshot of the current
/// trust context, so a refresh mid-handshake cannot tear it down. Rejected
/// handshakes (bad or missing client certificate) drop the connection
/// without serving anything.
async fn serve_peer(
    listener: TcpListener,
    trust: Arc<TrustManager>,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), GatewayError> {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("peer listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "peer accept failed");
                        continue;
                    }
                };

                let acceptor = trust.acceptor();
                let router = router.clone();
                tokio::spawn(async move {
                    let tls_stream = match acceptor.accept(stream).await {
                        Ok(s) => s,
                        Err(e) => {
                            warn!(remote = %remote, error = %e, "peer TLS handshake rejected");
                            return;
                        }
                    };

                    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        router.clone().oneshot(request)
                    });
                    if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection_with_upgrades(TokioIo::new(tls_stream), service)
                        .await
                    {
                        debug!(remote = %remote, error = %e, "peer connection ended");
                    }
                });
            }
        }
    }
}
