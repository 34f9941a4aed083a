//! In-memory event store.
//!
//! Stands in for the persistent transfer-event store behind the same port:
//! it owns delivery state, keeps emission order, and survives any number of
//! delegate reconnections (though not a process restart). Production
//! deployments swap in a durable implementation of [`EventSource`].

use async_trait::async_trait;
use courier_delivery::{DeliveryCoordinator, EventSource};
use parking_lot::Mutex;
use shared_types::{DeliveryState, Event, EventId, SourceError};
use std::sync::Arc;
use tracing::{debug, warn};

struct StoredEvent {
    event: Event,
    state: DeliveryState,
}

#[derive(Default)]
struct StoreInner {
    events: Vec<StoredEvent>,
    subscriber: Option<Arc<DeliveryCoordinator>>,
}

/// Ordered event store with source-owned delivery state.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the single active subscriber.
    ///
    /// New events are forwarded into the coordinator as they are published.
    /// Attaching again replaces the previous subscriber.
    pub fn subscribe(&self, coordinator: Arc<DeliveryCoordinator>) {
        let mut inner = self.inner.lock();
        if inner.subscriber.is_some() {
            warn!("replacing existing event store subscriber");
        }
        inner.subscriber = Some(coordinator);
    }

    /// Record a new event and offer it to the subscriber.
    pub async fn publish(&self, event: Event) {
        let subscriber = {
            let mut inner = self.inner.lock();
            inner.events.push(StoredEvent {
                event: event.clone(),
                state: DeliveryState::Pending,
            });
            inner.subscriber.clone()
        };

        match subscriber {
            Some(coordinator) => coordinator.on_event(event).await,
            None => debug!(event = %event.id, "no subscriber; event stays pending"),
        }
    }

    /// Number of events not yet acknowledged.
    pub fn unacknowledged(&self) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|s| s.state != DeliveryState::Acknowledged)
            .count()
    }
}

#[async_trait]
impl EventSource for InMemoryEventStore {
    async fn pending_and_in_flight(&self) -> Result<Vec<Event>, SourceError> {
        let mut inner = self.inner.lock();
        let mut backlog = Vec::new();
        for stored in inner.events.iter_mut() {
            if stored.state != DeliveryState::Acknowledged {
                // Returned events go straight to a delegate.
                stored.state = DeliveryState::Dispatched;
                backlog.push(stored.event.clone());
            }
        }
        Ok(backlog)
    }

    async fn mark_acknowledged(&self, event_id: &EventId) -> Result<(), SourceError> {
        let mut inner = self.inner.lock();
        let mut known = false;
        for stored in inner.events.iter_mut() {
            if &stored.event.id == event_id {
                stored.state = DeliveryState::Acknowledged;
                known = true;
            }
        }
        if !known {
            debug!(event = %event_id, "acknowledgment for unknown event");
        }
        Ok(())
    }
}
