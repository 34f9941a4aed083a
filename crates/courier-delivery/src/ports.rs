//! Outbound port to the event store.

use async_trait::async_trait;
use shared_types::{Event, EventId, SourceError};

/// The durable event store consumed by the coordinator.
///
/// The store is the source of truth for delivery state. The coordinator
/// pulls the full unacknowledged backlog at every delegate promotion and
/// reports acknowledgments back; it never persists anything itself.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Every event not yet acknowledged, in ascending emission order.
    async fn pending_and_in_flight(&self) -> Result<Vec<Event>, SourceError>;

    /// Record an acknowledgment for `event_id`.
    ///
    /// Must be idempotent: acknowledging a retired or unknown event is not
    /// an error condition the coordinator acts on.
    async fn mark_acknowledged(&self, event_id: &EventId) -> Result<(), SourceError>;
}
