//! Delegate-upgrade endpoint and session lifecycle.
//!
//! A consumer reaches the coordinator by upgrading `GET /delegate` on the
//! control listener to a WebSocket. The access gate ran before the upgrade,
//! so a session reaching this module is already authorized. Each session
//! owns a writer task draining the coordinator's outbound channel into the
//! socket; the reader half feeds acknowledgments back.

use crate::routes::ControlState;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use courier_delivery::DelegateConnection;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};

/// Tracks live delegate sessions so shutdown can wait for them.
#[derive(Default)]
pub struct SessionRegistry {
    active: AtomicUsize,
    drained_notify: Notify,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live delegate sessions.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Register a session; the guard deregisters on drop.
    pub fn register(self: &Arc<Self>) -> SessionGuard {
        self.active.fetch_add(1, Ordering::AcqRel);
        SessionGuard {
            registry: Arc::clone(self),
        }
    }

    /// Wait until every session has ended.
    pub async fn drained(&self) {
        loop {
            if self.active.load(Ordering::Acquire) == 0 {
                return;
            }
            self.drained_notify.notified().await;
        }
    }
}

/// Deregisters a session when dropped.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.registry.drained_notify.notify_one();
        }
    }
}

/// `GET /delegate` — upgrade to the delegate wire protocol.
pub async fn delegate_upgrade(
    State(state): State<ControlState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| delegate_session(state, socket))
}

/// Drive one delegate session until disconnect or shutdown.
async fn delegate_session(state: ControlState, socket: WebSocket) {
    let _guard = state.sessions.register();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let conn = DelegateConnection::new(outbound_tx);
    let id = conn.id();

    // The gate admitted this request before the upgrade completed.
    if let Err(e) = state.coordinator.on_connect(conn, true).await {
        warn!(connection = %id, error = %e, "delegate admission failed");
        return;
    }
    info!(connection = %id, "delegate connection established");

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => state.coordinator.on_ack(&text).await,
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => state.coordinator.on_ack(&text).await,
                    Err(_) => warn!(connection = %id, "discarding non-UTF-8 delegate message"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // pings and pongs are protocol-level noise
                Some(Err(e)) => {
                    warn!(connection = %id, error = %e, "delegate socket error");
                    break;
                }
            },
            _ = shutdown.changed() => {
                info!(connection = %id, "closing delegate connection for shutdown");
                break;
            }
        }
    }

    state.coordinator.on_disconnect(id).await;
    writer.abort();
    info!(connection = %id, "delegate connection closed");
}
