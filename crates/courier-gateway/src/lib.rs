//! # Courier Gateway
//!
//! Hosts the node's two network surfaces and the delegate-upgrade channel.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      LISTENER SUPERVISOR                       │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────┐     ┌───────────────────────────┐   │
//! │  │  Control (plain TCP)  │     │  Peer (mutual TLS)        │   │
//! │  │  control API routes   │     │  /v1/... peer routes      │   │
//! │  │  GET /delegate  ──────┼─┐   │  client cert ← peer CAs   │   │
//! │  └──────────┬────────────┘ │   └────────────┬──────────────┘   │
//! │             │              │                │                  │
//! │       ApiKeyGate           │          TrustManager             │
//! │    (x-api-key, exempt      │       (context snapshot per       │
//! │     documentation path)    │        accepted connection)       │
//! │                            ▼                                   │
//! │                   delegate sessions ←→ DeliveryCoordinator     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The control listener serves a trusted local application; admission is a
//! shared-secret header check. The peer listener authenticates peers with
//! mutual TLS and never consults the shared secret. Shutdown closes all
//! three surfaces concurrently under a deadline; a surface that refuses to
//! confirm is force-terminated.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod gate;
pub mod routes;
pub mod supervisor;
pub mod upgrade;

pub use config::{GatewayConfig, LimitsConfig, ListenerConfig, ShutdownConfig};
pub use gate::{authorize, constant_time_compare, ApiKeyGateLayer, GateConfig};
pub use routes::ControlState;
pub use supervisor::{ListenerAddrs, ListenerSupervisor};
pub use upgrade::SessionRegistry;

use std::io;

/// Errors raised by the listener supervisor.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A listener socket could not be bound at startup.
    #[error("failed to bind {surface} listener: {source}")]
    Bind {
        surface: &'static str,
        #[source]
        source: io::Error,
    },

    /// A listener failed while serving.
    #[error("{surface} listener error: {source}")]
    Serve {
        surface: &'static str,
        #[source]
        source: io::Error,
    },

    /// The gateway was started without valid configuration.
    #[error("invalid gateway configuration: {0}")]
    Config(String),

    /// Trust material could not be refreshed.
    #[error(transparent)]
    Trust(#[from] courier_trust::TrustError),
}
