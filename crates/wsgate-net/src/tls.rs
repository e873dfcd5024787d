//! TLS configuration for secure (`wss://`) sessions.
//!
//! # Custom CA Certificates
//!
//! ```ignore
//! use wsgate_net::tls::{Certificate, TlsConfig};
//!
//! let ca_cert = Certificate::from_pem_file("/path/to/ca.crt")?;
//!
//! let config = SessionConfig::new("wss://internal.example.com/ws")
//!     .tls_config(TlsConfig::new().add_root_certificate(ca_cert));
//! ```
//!
//! Plain `ws://` endpoints ignore the TLS configuration entirely.

use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::ring;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};

use crate::error::{NetworkError, Result};

/// Minimum TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVersion {
    /// TLS 1.2 (default minimum).
    #[default]
    Tls1_2,
    /// TLS 1.3 (most secure).
    Tls1_3,
}

impl TlsVersion {
    /// Convert to rustls protocol versions.
    pub(crate) fn to_rustls_versions(self) -> Vec<&'static rustls::SupportedProtocolVersion> {
        match self {
            TlsVersion::Tls1_2 => vec![&rustls::version::TLS12, &rustls::version::TLS13],
            TlsVersion::Tls1_3 => vec![&rustls::version::TLS13],
        }
    }
}

/// A TLS certificate to add to the trust store.
#[derive(Clone)]
pub struct Certificate {
    der_certs: Vec<CertificateDer<'static>>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("cert_count", &self.der_certs.len())
            .finish()
    }
}

impl Certificate {
    /// Load a certificate from PEM-encoded bytes.
    ///
    /// This can contain multiple certificates (a certificate chain or bundle).
    pub fn from_pem(pem_data: impl AsRef<[u8]>) -> Result<Self> {
        let mut reader = BufReader::new(Cursor::new(pem_data.as_ref()));
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| NetworkError::Tls(format!("Failed to parse PEM certificate: {}", e)))?;

        if certs.is_empty() {
            return Err(NetworkError::Tls(
                "No certificates found in PEM data".to_string(),
            ));
        }

        Ok(Self { der_certs: certs })
    }

    /// Load a certificate from a PEM-encoded file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let pem_data = std::fs::read(path.as_ref()).map_err(|e| {
            NetworkError::Tls(format!(
                "Failed to read certificate file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_pem(pem_data)
    }

    /// Load a certificate from DER-encoded bytes.
    pub fn from_der(der_data: impl Into<Vec<u8>>) -> Self {
        Self {
            der_certs: vec![CertificateDer::from(der_data.into())],
        }
    }

    /// Get the DER-encoded certificates.
    pub(crate) fn der_certs(&self) -> &[CertificateDer<'static>] {
        &self.der_certs
    }
}

/// TLS settings for a secure session.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Additional root certificates to trust.
    pub root_certificates: Vec<Certificate>,
    /// Whether to use only the provided root certificates (no bundled roots).
    pub use_only_custom_roots: bool,
    /// Minimum TLS version.
    pub min_version: TlsVersion,
    /// Accept invalid/self-signed certificates (DANGEROUS - testing only).
    pub danger_accept_invalid_certs: bool,
}

impl TlsConfig {
    /// Create a new TLS configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root certificate to trust.
    pub fn add_root_certificate(mut self, cert: Certificate) -> Self {
        self.root_certificates.push(cert);
        self
    }

    /// Use only custom root certificates (disable bundled roots).
    pub fn use_only_custom_roots(mut self) -> Self {
        self.use_only_custom_roots = true;
        self
    }

    /// Set the minimum TLS version.
    pub fn min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = version;
        self
    }

    /// Accept invalid certificates (DANGEROUS - for testing only).
    ///
    /// # Warning
    ///
    /// This disables certificate verification and makes the connection
    /// vulnerable to man-in-the-middle attacks.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.danger_accept_invalid_certs = true;
        self
    }

    /// Build the rustls `ClientConfig` described by these settings.
    pub fn build_rustls_config(&self) -> Result<Arc<ClientConfig>> {
        let versions = self.min_version.to_rustls_versions();
        let builder = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_protocol_versions(&versions)
            .map_err(|e| NetworkError::Tls(e.to_string()))?;

        if self.danger_accept_invalid_certs {
            tracing::warn!(
                target: wsgate_core::logging::targets::TLS,
                "certificate verification disabled"
            );
            let config = builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
                .with_no_client_auth();
            return Ok(Arc::new(config));
        }

        let root_store = self.build_root_store()?;
        let config = builder
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Arc::new(config))
    }

    /// Build a root certificate store.
    fn build_root_store(&self) -> Result<RootCertStore> {
        let mut root_store = RootCertStore::empty();

        if !self.use_only_custom_roots {
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }

        for cert in &self.root_certificates {
            for der_cert in cert.der_certs() {
                root_store.add(der_cert.clone()).map_err(|e| {
                    NetworkError::Tls(format!("Failed to add root certificate: {}", e))
                })?;
            }
        }

        if root_store.is_empty() {
            return Err(NetworkError::Tls(
                "No root certificates available. Either add custom certificates or \
                 don't use use_only_custom_roots()"
                    .to_string(),
            ));
        }

        Ok(root_store)
    }
}

/// A certificate verifier that accepts all certificates.
///
/// Used when `danger_accept_invalid_certs` is enabled.
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_from_der() {
        let der = vec![0x30, 0x03, 0x02, 0x01, 0x00];
        let cert = Certificate::from_der(der);
        assert_eq!(cert.der_certs().len(), 1);
    }

    #[test]
    fn test_certificate_from_pem_without_certs_fails() {
        let result = Certificate::from_pem("no pem blocks in here");
        assert!(matches!(result, Err(NetworkError::Tls(_))));
    }

    #[test]
    fn test_build_rustls_config_with_bundled_roots() {
        assert!(TlsConfig::new().build_rustls_config().is_ok());
    }

    #[test]
    fn test_only_custom_roots_without_certs_fails() {
        let result = TlsConfig::new().use_only_custom_roots().build_rustls_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_dangerous_config_builds() {
        let config = TlsConfig::new()
            .use_only_custom_roots()
            .danger_accept_invalid_certs();
        assert!(config.build_rustls_config().is_ok());
    }

    #[test]
    fn test_tls_version_to_rustls_versions() {
        assert_eq!(TlsVersion::Tls1_2.to_rustls_versions().len(), 2);
        assert_eq!(TlsVersion::Tls1_3.to_rustls_versions().len(), 1);
    }
}
