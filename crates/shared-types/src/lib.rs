//! # Shared Types Crate
//!
//! This crate contains the domain entities and delegate wire messages shared
//! by every Courier subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Source-Owned State**: The event store owns delivery state; every other
//!   component holds a view over it, never the canonical record.

pub mod errors;
pub mod events;
pub mod wire;

pub use errors::SourceError;
pub use events::{DeliveryState, Event, EventId};
pub use wire::{encode_event_frame, parse_ack, AckAction, AckParseError, Acknowledgment};
