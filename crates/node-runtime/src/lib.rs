//! # Courier Node Runtime
//!
//! The main entry point for the Courier node.
//!
//! ## Modular Structure
//!
//! - `config/` — node configuration loading and validation
//! - `adapters/` — port implementations connecting subsystems (file-backed
//!   certificate store, in-memory event store)
//! - `runtime/` — construction and lifecycle of the wired node
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file + environment overrides)
//! 2. Load TLS identity and peer CAs; build the trust manager
//! 3. Wire the event store into the delivery coordinator
//! 4. Start both listeners; log their addresses
//! 5. Run until the shutdown signal, then close all surfaces (bounded)

pub mod adapters;
pub mod config;
pub mod runtime;

pub use adapters::{FileCertificateStore, InMemoryEventStore};
pub use config::{IdentityConfig, NodeConfig};
pub use runtime::NodeRuntime;
