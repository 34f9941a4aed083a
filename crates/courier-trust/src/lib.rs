//! # Courier Trust
//!
//! Mutual-TLS trust management for the external peer listener.
//!
//! The [`TrustManager`] owns the node's TLS server context: the local
//! identity (certificate chain + private key) and the set of peer
//! certificate authorities accepted for client authentication. The peer CA
//! set is reloadable at runtime; a refresh builds a fresh context and swaps
//! it in a single reference replacement, so handshakes in progress finish
//! against whichever context they started with.
//!
//! ```text
//! TCP accept
//!   → TrustManager::acceptor()      (snapshot of the current context)
//!   → TLS handshake                 (client cert verified against peer CAs)
//!   → application routes
//! ```
//!
//! Certificate and key bytes are loaded through the [`CertificateStore`]
//! port; where they live and how they rotate is the store's business.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod manager;
pub mod store;

pub use manager::TrustManager;
pub use store::{parse_certificates, CertificateStore, LocalIdentity};

// Adapters implementing [`CertificateStore`] need these in signatures.
pub use rustls::pki_types::CertificateDer;

/// Errors raised while building or refreshing trust material.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Certificate bytes could not be parsed or accepted.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Private key bytes could not be parsed.
    #[error("private key error: {0}")]
    PrivateKey(String),

    /// The client-certificate verifier could not be constructed.
    #[error("client verifier error: {0}")]
    Verifier(String),

    /// The TLS server configuration could not be assembled.
    #[error("TLS configuration error: {0}")]
    Config(String),

    /// The certificate store failed to produce material.
    #[error("certificate store error: {0}")]
    Store(String),

    /// A reloaded CA bundle contained no certificates.
    #[error("peer CA bundle is empty")]
    EmptyCaBundle,
}
