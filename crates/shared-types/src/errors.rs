//! Errors surfaced by external collaborators.

use crate::events::EventId;

/// Errors returned by the event store.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The store has no record of the event.
    #[error("event not found: {0}")]
    NotFound(EventId),
    /// The store could not be reached or read.
    #[error("event store unavailable: {0}")]
    Unavailable(String),
}
