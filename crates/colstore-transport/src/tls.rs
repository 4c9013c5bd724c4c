//! TLS configuration and rustls client setup.

use std::path::PathBuf;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

use crate::error::TransportError;

/// TLS settings for encrypted endpoints.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to a PEM file with additional trusted CA certificates.
    ///
    /// When unset, the bundled webpki roots are used.
    pub ca_file: Option<PathBuf>,

    /// Skip server certificate verification entirely.
    ///
    /// Accepts any certificate the server presents, so the connection is
    /// encrypted but not authenticated. Development only.
    pub trust_server_certificate: bool,
}

impl TlsConfig {
    /// Create a configuration with webpki roots and full verification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust additional CA certificates from a PEM file.
    #[must_use]
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Set whether to skip server certificate verification.
    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// Build the rustls client configuration.
    pub(crate) fn build_client_config(&self) -> Result<rustls::ClientConfig, TransportError> {
        if self.trust_server_certificate {
            tracing::warn!("server certificate verification is disabled");
            let verifier = AcceptAnyServerCert::new();
            return Ok(rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
                .with_no_client_auth());
        }

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(path) = &self.ca_file {
            let file = std::fs::File::open(path).map_err(|e| {
                TransportError::TlsConfig(format!("cannot open CA file {}: {e}", path.display()))
            })?;
            let mut reader = std::io::BufReader::new(file);
            let mut added = 0usize;
            for cert in rustls_pemfile::certs(&mut reader) {
                let cert = cert.map_err(|e| {
                    TransportError::TlsConfig(format!(
                        "cannot parse CA file {}: {e}",
                        path.display()
                    ))
                })?;
                roots.add(cert).map_err(|e| {
                    TransportError::TlsConfig(format!(
                        "cannot add certificate from {}: {e}",
                        path.display()
                    ))
                })?;
                added += 1;
            }
            if added == 0 {
                return Err(TransportError::TlsConfig(format!(
                    "no certificates found in {}",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), count = added, "loaded CA certificates");
        }

        Ok(rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth())
    }
}

/// Certificate verifier that accepts anything.
///
/// Signature verification still runs so the handshake remains well-formed;
/// only the trust decision is skipped.
#[derive(Debug)]
struct AcceptAnyServerCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl AcceptAnyServerCert {
    fn new() -> Self {
        Self {
            algorithms: rustls::crypto::ring::default_provider().signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = TlsConfig::new();
        assert!(config.build_client_config().is_ok());
    }

    #[test]
    fn test_insecure_config_builds() {
        let config = TlsConfig::new().trust_server_certificate(true);
        assert!(config.build_client_config().is_ok());
    }

    #[test]
    fn test_missing_ca_file() {
        let config = TlsConfig::new().ca_file("/nonexistent/ca.pem");
        assert!(matches!(
            config.build_client_config(),
            Err(TransportError::TlsConfig(_))
        ));
    }
}
