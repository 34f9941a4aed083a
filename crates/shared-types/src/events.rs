//! Lifecycle event entities.
//!
//! Events are created by the event store (the durable source of truth) and
//! relayed to the active delegate. The coordinator only ever holds a view of
//! events that are dispatched but not yet acknowledged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque event identifier assigned by the event store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A lifecycle event ready for delivery to the active delegate.
///
/// The payload is an arbitrary JSON object describing transfer progress
/// (message received, file chunk stored, ...). Its keys are flattened beside
/// `type` and `id` on the wire; payload keys never shadow either field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identity assigned by the event store.
    pub id: EventId,
    /// Event type tag (e.g. `message.received`, `file.progress`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload fields.
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(
        id: impl Into<EventId>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Delivery state of an event, owned by the event store.
///
/// `Acknowledged` is terminal. The coordinator's in-flight view corresponds
/// to `Dispatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Not yet sent to any delegate.
    Pending,
    /// Sent to a delegate, awaiting acknowledgment.
    Dispatched,
    /// Acknowledgment observed; the event is retired.
    Acknowledged,
}
