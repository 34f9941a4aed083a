//! Trust manager: builds and hot-swaps the peer listener's TLS context.

use crate::store::{CertificateStore, LocalIdentity};
use crate::TrustError;
use parking_lot::RwLock;
use rustls::pki_types::CertificateDer;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

/// Owns the active TLS server context for the external peer listener.
///
/// The context requires client certificates validated against the current
/// peer CA set. [`TrustManager::refresh`] reloads the CA bundle through the
/// certificate store and swaps the context in one write; connections already
/// established, and handshakes already started from an earlier
/// [`TrustManager::acceptor`] snapshot, are untouched. A failed reload keeps
/// the previous context in force.
pub struct TrustManager {
    store: Arc<dyn CertificateStore>,
    identity: LocalIdentity,
    context: RwLock<Arc<ServerConfig>>,
}

impl TrustManager {
    /// Load identity and peer CAs from the store and build the first context.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot produce material or the material is invalid;
    /// the node must not start without a valid peer-facing context.
    pub fn new(store: Arc<dyn CertificateStore>) -> Result<Self, TrustError> {
        let identity = store.load_local_identity()?;
        let peer_cas = store.load_peer_cas()?;
        let context = build_context(&identity, &peer_cas)?;
        info!(peer_cas = peer_cas.len(), "TLS trust context initialized");

        Ok(Self {
            store,
            identity,
            context: RwLock::new(context),
        })
    }

    /// Reload the peer CA bundle and atomically swap the active context.
    ///
    /// # Errors
    ///
    /// If the reload or the rebuild fails, the previous context remains
    /// active and the error is returned.
    pub fn refresh(&self) -> Result<(), TrustError> {
        let peer_cas = match self.store.load_peer_cas() {
            Ok(cas) => cas,
            Err(e) => {
                warn!(error = %e, "peer CA reload failed; keeping previous trust context");
                return Err(e);
            }
        };

        let next = build_context(&self.identity, &peer_cas)?;
        *self.context.write() = next;
        info!(peer_cas = peer_cas.len(), "TLS trust context refreshed");
        Ok(())
    }

    /// Snapshot of the current server context.
    pub fn current_context(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.context.read())
    }

    /// Acceptor over the current context, taken per accepted connection.
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(self.current_context())
    }
}

/// Build a server context requiring client certificates against `peer_cas`.
fn build_context(
    identity: &LocalIdentity,
    peer_cas: &[CertificateDer<'static>],
) -> Result<Arc<ServerConfig>, TrustError> {
    if peer_cas.is_empty() {
        return Err(TrustError::EmptyCaBundle);
    }

    let mut roots = RootCertStore::empty();
    for ca in peer_cas {
        roots
            .add(ca.clone())
            .map_err(|e| TrustError::Certificate(format!("failed to add peer CA: {e}")))?;
    }

    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| TrustError::Verifier(e.to_string()))?;

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain.clone(), identity.key.clone_key())
        .map_err(|e| TrustError::Config(e.to_string()))?;

    Ok(Arc::new(config))
}

#[cfg(test)]
pub mod test_utils {
    //! Throwaway certificate generation for trust tests.

    use rcgen::{CertificateParams, DnType, KeyPair};

    /// Generate a self-signed CA, returning `(cert_pem, key_pem)`.
    #[must_use]
    pub fn generate_ca(name: &str) -> (Vec<u8>, Vec<u8>) {
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);

        let key = KeyPair::generate().expect("key generation");
        let cert = params.self_signed(&key).expect("CA self-signing");
        (cert.pem().into_bytes(), key.serialize_pem().into_bytes())
    }

    /// Generate a leaf certificate signed by the given CA.
    #[must_use]
    pub fn generate_leaf(
        ca_cert_pem: &[u8],
        ca_key_pem: &[u8],
        name: &str,
    ) -> (Vec<u8>, Vec<u8>) {
        let ca_key = KeyPair::from_pem(&String::from_utf8_lossy(ca_key_pem)).expect("CA key");
        let ca_params = CertificateParams::from_ca_cert_pem(&String::from_utf8_lossy(ca_cert_pem))
            .expect("CA params");
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
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::store::parse_certificates;
    use parking_lot::Mutex;

    /// Store backed by in-memory PEM bytes with a swappable CA bundle.
    struct MemoryStore {
        cert_pem: Vec<u8>,
        key_pem: Vec<u8>,
        ca_pem: Mutex<Result<Vec<u8>, String>>,
    }

    impl MemoryStore {
        fn new(cert_pem: Vec<u8>, key_pem: Vec<u8>, ca_pem: Vec<u8>) -> Self {
            Self {
                cert_pem,
                key_pem,
                ca_pem: Mutex::new(Ok(ca_pem)),
            }
        }

        fn set_ca_bundle(&self, ca_pem: Vec<u8>) {
            *self.ca_pem.lock() = Ok(ca_pem);
        }

        fn fail_reloads(&self, reason: &str) {
            *self.ca_pem.lock() = Err(reason.to_string());
        }
    }

    impl CertificateStore for MemoryStore {
        fn load_local_identity(&self) -> Result<LocalIdentity, TrustError> {
            LocalIdentity::from_pem(&self.cert_pem, self.key_pem.clone())
        }

        fn load_peer_cas(&self) -> Result<Vec<CertificateDer<'static>>, TrustError> {
            match &*self.ca_pem.lock() {
                Ok(pem) => parse_certificates(pem),
                Err(reason) => Err(TrustError::Store(reason.clone())),
            }
        }
    }

    fn manager_with_store() -> (TrustManager, Arc<MemoryStore>) {
        let (ca_cert, ca_key) = generate_ca("Test Peer CA");
        let (leaf_cert, leaf_key) = generate_leaf(&ca_cert, &ca_key, "courier-node");
        let store = Arc::new(MemoryStore::new(leaf_cert, leaf_key, ca_cert));
        let manager = TrustManager::new(Arc::clone(&store) as Arc<dyn CertificateStore>)
            .expect("manager builds");
        (manager, store)
    }

    #[test]
    fn test_initial_context_builds() {
        let (manager, _store) = manager_with_store();
        let _acceptor = manager.acceptor();
    }

    #[test]
    fn test_refresh_swaps_context() {
        let (manager, store) = manager_with_store();
        let before = manager.current_context();

        let (new_ca, _) = generate_ca("Rotated Peer CA");
        store.set_ca_bundle(new_ca);
        manager.refresh().expect("refresh succeeds");

        let after = manager.current_context();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_failed_reload_keeps_previous_context() {
        let (manager, store) = manager_with_store();
        let before = manager.current_context();

        store.fail_reloads("disk on fire");
        let result = manager.refresh();

        assert!(matches!(result, Err(TrustError::Store(_))));
        assert!(Arc::ptr_eq(&before, &manager.current_context()));
    }

    #[test]
    fn test_empty_ca_bundle_rejected() {
        let (manager, store) = manager_with_store();
        let before = manager.current_context();

        store.set_ca_bundle(Vec::new());
        let result = manager.refresh();

        assert!(matches!(result, Err(TrustError::EmptyCaBundle)));
        assert!(Arc::ptr_eq(&before, &manager.current_context()));
    }

    #[test]
    fn test_snapshot_survives_refresh() {
        // A handshake started from an older snapshot keeps its config alive.
        let (manager, store) = manager_with_store();
        let snapshot = manager.current_context();

        let (new_ca, _) = generate_ca("Rotated Peer CA");
        store.set_ca_bundle(new_ca);
        manager.refresh().expect("refresh succeeds");

        assert!(Arc::strong_count(&snapshot) >= 1);
        assert!(!Arc::ptr_eq(&snapshot, &manager.current_context()));
    }
}
