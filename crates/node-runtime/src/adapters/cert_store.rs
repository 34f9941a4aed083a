//! File-backed certificate store.

use crate::config::IdentityConfig;
use courier_trust::{
    parse_certificates, CertificateDer, CertificateStore, LocalIdentity, TrustError,
};
use std::path::{Path, PathBuf};

/// Loads certificate material from the paths named in the node config.
///
/// The peer CA bundle is re-read from disk on every call, which is what
/// makes `POST /trust/refresh` pick up rotated authorities without a
/// restart.
pub struct FileCertificateStore {
    cert_path: PathBuf,
    key_path: PathBuf,
    peer_ca_path: PathBuf,
}

impl FileCertificateStore {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            cert_path: identity.cert_path.clone(),
            key_path: identity.key_path.clone(),
            peer_ca_path: identity.peer_ca_path.clone(),
        }
    }

    fn read(path: &Path) -> Result<Vec<u8>, TrustError> {
        std::fs::read(path)
            .map_err(|e| TrustError::Store(format!("failed to read {}: {e}", path.display())))
    }
}

impl CertificateStore for FileCertificateStore {
    fn load_local_identity(&self) -> Result<LocalIdentity, TrustError> {
        let cert_pem = Self::read(&self.cert_path)?;
        let key_pem = Self::read(&self.key_path)?;
        LocalIdentity::from_pem(&cert_pem, key_pem)
    }

    fn load_peer_cas(&self) -> Result<Vec<CertificateDer<'static>>, TrustError> {
        parse_certificates(&Self::read(&self.peer_ca_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair};
    use std::fs;

    fn write_material(dir: &std::path::Path) -> IdentityConfig {
        let mut ca_params = CertificateParams::default();
        ca_params.distinguished_name.push(DnType::CommonName, "Test CA");
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let mut leaf_params = CertificateParams::default();
        leaf_params
            .distinguished_name
            .push(DnType::CommonName, "courier-node");
        let leaf_key = KeyPair::generate().unwrap();
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

        let identity = IdentityConfig {
            cert_path: dir.join("node.crt"),
            key_path: dir.join("node.key"),
            peer_ca_path: dir.join("peer-cas.crt"),
        };
        fs::write(&identity.cert_path, leaf_cert.pem()).unwrap();
        fs::write(&identity.key_path, leaf_key.serialize_pem()).unwrap();
        fs::write(&identity.peer_ca_path, ca_cert.pem()).unwrap();
        identity
    }

    #[test]
    fn test_loads_identity_and_cas() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(&write_material(dir.path()));

        let identity = store.load_local_identity().unwrap();
        assert_eq!(identity.cert_chain.len(), 1);

        let cas = store.load_peer_cas().unwrap();
        assert_eq!(cas.len(), 1);
    }

    #[test]
    fn test_missing_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityConfig {
            cert_path: dir.path().join("missing.crt"),
            key_path: dir.path().join("missing.key"),
            peer_ca_path: dir.path().join("missing-cas.crt"),
        };
        let store = FileCertificateStore::new(&identity);

        assert!(matches!(
            store.load_local_identity(),
            Err(TrustError::Store(_))
        ));
        assert!(matches!(store.load_peer_cas(), Err(TrustError::Store(_))));
    }

    #[test]
    fn test_ca_reload_sees_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let identity = write_material(dir.path());
        let store = FileCertificateStore::new(&identity);
        assert_eq!(store.load_peer_cas().unwrap().len(), 1);

        // Append a second authority; the next load must see both.
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, "Second CA");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();

        let mut bundle = fs::read(&identity.peer_ca_path).unwrap();
        bundle.extend_from_slice(cert.pem().as_bytes());
        fs::write(&identity.peer_ca_path, bundle).unwrap();

        assert_eq!(store.load_peer_cas().unwrap().len(), 2);
    }
}
