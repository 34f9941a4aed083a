//! Delivery coordinator: the single delegate slot and its failover queue.

use crate::connection::{ConnectionId, DelegateConnection};
use crate::ports::EventSource;
use crate::DeliveryError;
use serde::Serialize;
use shared_types::{encode_event_frame, parse_ack, AckParseError, Event, EventId, SourceError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Coordinates delivery of store events to a single active delegate.
///
/// ## Thread Safety
///
/// Shared across tasks via `Arc`. Every slot transition — connect,
/// disconnect, acknowledgment, dispatch — runs under one async mutex, so
/// promotions and in-flight retirement are linearizable: two racing
/// disconnect/connect calls can never leave two delegates active.
pub struct DeliveryCoordinator {
    /// Durable event store (source of truth for delivery state).
    source: Arc<dyn EventSource>,
    /// Slot, pool, and in-flight view under the serialization point.
    state: Mutex<CoordinatorState>,
}

#[derive(Default)]
struct CoordinatorState {
    /// The active delegate, if any.
    delegate: Option<DelegateConnection>,
    /// Connected consumers waiting for promotion, oldest first.
    candidates: VecDeque<DelegateConnection>,
    /// Dispatched-but-unacknowledged events, in emission order.
    in_flight: Vec<Event>,
}

impl CoordinatorState {
    fn track(&mut self, event: Event) {
        if !self.in_flight.iter().any(|e| e.id == event.id) {
            self.in_flight.push(event);
        }
    }

    fn retire(&mut self, id: &EventId) -> bool {
        let before = self.in_flight.len();
        self.in_flight.retain(|e| &e.id != id);
        self.in_flight.len() != before
    }
}

/// Snapshot of coordinator occupancy, served by the control API.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeliveryStats {
    pub delegate_active: bool,
    pub candidates: usize,
    pub in_flight: usize,
}

impl DeliveryCoordinator {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Offer a new event for delivery.
    ///
    /// With no active delegate the event simply stays pending at the source;
    /// it will be recovered by the backlog pull at the next promotion. A
    /// failed send is an implicit disconnect of the delegate.
    pub async fn on_event(&self, event: Event) {
        let mut state = self.state.lock().await;
        let Some(delegate) = state.delegate.clone() else {
            debug!(event = %event.id, "no active delegate; event stays pending at the source");
            return;
        };

        match delegate.send(encode_event_frame(&event)) {
            Ok(()) => {
                debug!(event = %event.id, connection = %delegate.id(), "event dispatched");
                state.track(event);
            }
            Err(e) => {
                warn!(
                    event = %event.id,
                    connection = %delegate.id(),
                    error = %e,
                    "dispatch failed; treating delegate as disconnected"
                );
                state.track(event);
                self.replace_delegate(&mut state).await;
            }
        }
    }

    /// Admit a newly established consumer connection.
    ///
    /// An unauthorized connection is rejected before admission. Otherwise
    /// the connection is promoted immediately if the slot is empty, or
    /// queued at the tail of the candidate pool.
    pub async fn on_connect(
        &self,
        conn: DelegateConnection,
        authorized: bool,
    ) -> Result<(), DeliveryError> {
        if !authorized {
            warn!(connection = %conn.id(), "rejecting unauthorized consumer connection");
            return Err(DeliveryError::Unauthorized(conn.id()));
        }

        let mut state = self.state.lock().await;
        if state.delegate.is_some() {
            state.candidates.push_back(conn);
            debug!(pool = state.candidates.len(), "delegate slot busy; consumer queued");
            return Ok(());
        }

        // Slot empty implies the pool is empty, so a dead connection here
        // leaves nothing to fail over to.
        self.promote(&mut state, conn).await;
        Ok(())
    }

    /// Handle a consumer connection going away.
    pub async fn on_disconnect(&self, id: ConnectionId) {
        let mut state = self.state.lock().await;

        let before = state.candidates.len();
        state.candidates.retain(|c| c.id() != id);
        if state.candidates.len() != before {
            debug!(connection = %id, pool = state.candidates.len(), "candidate removed");
            return;
        }

        let was_delegate = state.delegate.as_ref().map(DelegateConnection::id) == Some(id);
        if was_delegate {
            info!(
                connection = %id,
                in_flight = state.in_flight.len(),
                "active delegate disconnected"
            );
            self.replace_delegate(&mut state).await;
        } else {
            debug!(connection = %id, "disconnect for unknown connection ignored");
        }
    }

    /// Process a raw upstream message from the active delegate.
    ///
    /// Malformed messages are logged and discarded; a stale acknowledgment
    /// for an event that is no longer tracked is a no-op.
    pub async fn on_ack(&self, raw: &str) {
        let ack = match parse_ack(raw) {
            Ok(ack) => ack,
            Err(AckParseError::Malformed(e)) => {
                warn!(error = %e, "discarding delegate message that is not JSON");
                return;
            }
            Err(e) => {
                warn!(error = %e, "discarding unrecognized delegate message");
                return;
            }
        };

        let mut state = self.state.lock().await;
        let was_tracked = state.retire(&ack.event_id);
        match self.source.mark_acknowledged(&ack.event_id).await {
            Ok(()) => debug!(
                event = %ack.event_id,
                action = ?ack.action,
                tracked = was_tracked,
                "event acknowledged"
            ),
            Err(SourceError::NotFound(_)) => {
                debug!(event = %ack.event_id, "acknowledgment for unknown event ignored");
            }
            Err(e) => error!(
                event = %ack.event_id,
                error = %e,
                "failed to record acknowledgment"
            ),
        }
    }

    /// Current occupancy snapshot.
    pub async fn stats(&self) -> DeliveryStats {
        let state = self.state.lock().await;
        DeliveryStats {
            delegate_active: state.delegate.is_some(),
            candidates: state.candidates.len(),
            in_flight: state.in_flight.len(),
        }
    }

    /// Clear the slot and promote candidates until one sticks.
    async fn replace_delegate(&self, state: &mut CoordinatorState) {
        state.delegate = None;
        while let Some(next) = state.candidates.pop_front() {
            if self.promote(state, next).await {
                return;
            }
        }
    }

    /// Install `conn` as the delegate and redispatch the store's backlog.
    ///
    /// The in-flight view is rebuilt from what the store returns: everything
    /// still unacknowledged, re-sent in original emission order ahead of any
    /// newer event (callers of [`Self::on_event`] queue on the state lock).
    /// Returns `false` if the connection died mid-redispatch.
    async fn promote(&self, state: &mut CoordinatorState, conn: DelegateConnection) -> bool {
        info!(connection = %conn.id(), pool = state.candidates.len(), "promoting delegate");
        state.delegate = Some(conn.clone());

        let backlog = match self.source.pending_and_in_flight().await {
            Ok(events) => events,
            Err(e) => {
                // The delegate stays; the backlog is recovered at the next
                // promotion, and new events still flow.
                error!(
                    connection = %conn.id(),
                    error = %e,
                    "failed to recover backlog for new delegate"
                );
                return true;
            }
        };

        state.in_flight.clear();
        let count = backlog.len();
        for event in backlog {
            if let Err(e) = conn.send(encode_event_frame(&event)) {
                warn!(connection = %conn.id(), error = %e, "delegate lost during redispatch");
                state.delegate = None;
                return false;
            }
            state.track(event);
        }

        if count > 0 {
            info!(connection = %conn.id(), redispatched = count, "backlog redispatched");
        }
        true
    }
}
