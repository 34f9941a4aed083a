//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use courier_delivery::EventSource;
use courier_trust::{CertificateStore, LocalIdentity, TrustError, TrustManager};
use parking_lot::Mutex;
use rcgen::{CertificateParams, DnType, KeyPair};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use shared_types::{Event, EventId, SourceError};
use std::sync::Arc;
use std::sync::Once;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider once per test binary.
pub fn init_crypto() {
    CRYPTO_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("failed to install crypto provider");
    });
}

/// Generate a self-signed CA, returning `(cert_pem, key_pem)`.
pub fn generate_ca(name: &str) -> (Vec<u8>, Vec<u8>) {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, name);
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);

    let key = KeyPair::generate().expect("key generation");
    let cert = params.self_signed(&key).expect("CA self-signing");
    (cert.pem().into_bytes(), key.serialize_pem().into_bytes())
}

/// Generate a leaf certificate signed by the given CA, SAN `localhost`.
pub fn generate_leaf(ca_cert_pem: &[u8], ca_key_pem: &[u8], name: &str) -> (Vec<u8>, Vec<u8>) {
    let ca_key = KeyPair::from_pem(&String::from_utf8_lossy(ca_key_pem)).expect("CA key");
    let ca_params =
        CertificateParams::from_ca_cert_pem(&String::from_utf8_lossy(ca_cert_pem)).expect("CA");
    let ca_cert = ca_params.self_signed(&ca_key).expect("CA cert");

    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, name);
    params.subject_alt_names = vec![rcgen::SanType::DnsName(
        "localhost".try_into().expect("valid DNS name"),
    )];

    let key = KeyPair::generate().expect("leaf key generation");
    let cert = params
        .signed_by(&key, &ca_cert, &ca_key)
        .expect("leaf signing");
    (cert.pem().into_bytes(), key.serialize_pem().into_bytes())
}

/// Certificate store over in-memory PEM bytes with a swappable CA bundle.
pub struct MemoryCertStore {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    ca_pem: Mutex<Vec<u8>>,
}

impl MemoryCertStore {
    pub fn new(cert_pem: Vec<u8>, key_pem: Vec<u8>, ca_pem: Vec<u8>) -> Self {
        Self {
            cert_pem,
            key_pem,
            ca_pem: Mutex::new(ca_pem),
        }
    }

    pub fn set_ca_bundle(&self, ca_pem: Vec<u8>) {
        *self.ca_pem.lock() = ca_pem;
    }
}

impl CertificateStore for MemoryCertStore {
    fn load_local_identity(&self) -> Result<LocalIdentity, TrustError> {
        LocalIdentity::from_pem(&self.cert_pem, self.key_pem.clone())
    }

    fn load_peer_cas(&self) -> Result<Vec<CertificateDer<'static>>, TrustError> {
        CertificateDer::pem_slice_iter(&self.ca_pem.lock())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TrustError::Certificate(e.to_string()))
    }
}

/// Event source with nothing to deliver.
pub struct EmptySource;

#[async_trait]
impl EventSource for EmptySource {
    async fn pending_and_in_flight(&self) -> Result<Vec<Event>, SourceError> {
        Ok(Vec::new())
    }

    async fn mark_acknowledged(&self, _event_id: &EventId) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Trust material shared by the gateway tests.
pub struct TrustFixture {
    pub trust: Arc<TrustManager>,
    pub store: Arc<MemoryCertStore>,
    /// Initial CA certificate, trusted for both server and client leaves.
    pub ca_cert_pem: Vec<u8>,
    /// Initial CA key, for minting client certificates.
    pub ca_key_pem: Vec<u8>,
}

/// Build a trust manager over freshly generated material.
pub fn trust_fixture() -> TrustFixture {
    init_crypto();
    let (ca_cert, ca_key) = generate_ca("Courier Test CA");
    let (leaf_cert, leaf_key) = generate_leaf(&ca_cert, &ca_key, "courier-node");
    let store = Arc::new(MemoryCertStore::new(leaf_cert, leaf_key, ca_cert.clone()));
    let trust = Arc::new(
        TrustManager::new(Arc::clone(&store) as Arc<dyn CertificateStore>)
            .expect("trust manager builds"),
    );
    TrustFixture {
        trust,
        store,
        ca_cert_pem: ca_cert,
        ca_key_pem: ca_key,
    }
}
