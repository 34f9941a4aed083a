//! # Courier Delivery
//!
//! The event delivery coordinator: relays lifecycle events from the event
//! store to exactly one downstream delegate with at-least-once delivery.
//!
//! ## Architecture
//!
//! ```text
//!  event store ──on_event──→ ┌─────────────────────────┐
//!                            │  DeliveryCoordinator     │
//!  upgrade  ────on_connect─→ │   delegate slot (0..1)   │──frames──→ delegate
//!  endpoint ──on_disconnect→ │   candidate pool (FIFO)  │←──acks────
//!                            │   in-flight view         │
//!                            └───────────┬─────────────┘
//!                            pending_and_in_flight / mark_acknowledged
//!                                        ↓
//!                                   event store
//! ```
//!
//! One delegate is active at a time; other connected consumers wait in a
//! FIFO candidate pool. When the delegate changes, everything the store
//! still holds as pending or in-flight is re-sent to the new delegate, in
//! original emission order, before anything newer. The store is the durable
//! queue — the coordinator never buffers events it could not deliver.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod coordinator;
pub mod ports;

pub use connection::{ConnectionId, DelegateConnection};
pub use coordinator::{DeliveryCoordinator, DeliveryStats};
pub use ports::EventSource;

use shared_types::SourceError;

/// Errors raised by the delivery coordinator.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The connection failed the access check and was not admitted.
    #[error("connection {0} not authorized")]
    Unauthorized(ConnectionId),

    /// The delegate connection's outbound channel is closed.
    #[error("delegate connection {0} closed")]
    ConnectionClosed(ConnectionId),

    /// The event store failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}
