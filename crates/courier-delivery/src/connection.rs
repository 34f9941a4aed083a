//! Delegate connection handles.

use crate::DeliveryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of a consumer connection. Does not survive reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to a connected consumer.
///
/// Frames pushed here are drained by the connection's writer task; the push
/// itself never blocks, so a slow delegate degrades to disconnect/failover
/// instead of stalling event ingestion.
#[derive(Clone)]
pub struct DelegateConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
}

impl DelegateConnection {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame for the connection's writer task.
    ///
    /// # Errors
    ///
    /// Fails if the writer side is gone; the caller treats this as an
    /// implicit disconnect.
    pub fn send(&self, frame: String) -> Result<(), DeliveryError> {
        self.outbound
            .send(frame)
            .map_err(|_| DeliveryError::ConnectionClosed(self.id))
    }
}

impl fmt::Debug for DelegateConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateConnection")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
