//! Certificate store port and local identity material.

use crate::TrustError;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use zeroize::Zeroizing;

/// The node's own TLS identity.
pub struct LocalIdentity {
    /// Leaf certificate first, then any intermediates.
    pub cert_chain: Vec<CertificateDer<'static>>,
    /// Private key matching the leaf certificate.
    pub key: PrivateKeyDer<'static>,
}

impl LocalIdentity {
    /// Parse an identity from PEM bytes.
    ///
    /// The key PEM is held in a zeroizing buffer so it is wiped once the
    /// parsed key takes over.
    pub fn from_pem(cert_pem: &[u8], key_pem: Vec<u8>) -> Result<Self, TrustError> {
        let key_pem = Zeroizing::new(key_pem);

        let cert_chain = parse_certificates(cert_pem)?;
        if cert_chain.is_empty() {
            return Err(TrustError::Certificate(
                "no certificates in identity PEM".into(),
            ));
        }

        let key = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| TrustError::PrivateKey(format!("failed to parse private key: {e}")))?;

        Ok(Self { cert_chain, key })
    }
}

/// Source of certificate material, implemented by the runtime.
///
/// `load_peer_cas` is called again on every trust refresh; implementations
/// should re-read their backing storage rather than cache.
pub trait CertificateStore: Send + Sync {
    /// Load the node's certificate chain and private key.
    fn load_local_identity(&self) -> Result<LocalIdentity, TrustError>;

    /// Load the trust anchors accepted for peer client authentication.
    fn load_peer_cas(&self) -> Result<Vec<CertificateDer<'static>>, TrustError>;
}

/// Parse PEM-encoded certificates.
pub fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TrustError> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TrustError::Certificate(format!("failed to parse certificates: {e}")))
}
