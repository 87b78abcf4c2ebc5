//! TLS/SSL infrastructure.
//!
//! Builds rustls client configurations (trusted roots, optional client
//! identity, optional no-verify mode) and runs the handshake over a dialed
//! TCP stream.

use crate::error::TlsError;
use crate::shared::client_cert::ClientIdentity;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Trait for TLS configuration providers.
pub trait TlsProvider: Send + Sync {
    fn client_config(&self) -> Arc<ClientConfig>;

    fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.client_config())
    }
}

/// rustls provider built once per run from the command line options.
#[derive(Clone)]
pub struct RustlsTlsProvider {
    config: Arc<ClientConfig>,
}

impl RustlsTlsProvider {
    pub fn new(identity: Option<&ClientIdentity>, insecure: bool) -> Result<Self, TlsError> {
        Ok(Self {
            config: create_tls_config(identity, insecure)?,
        })
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn client_config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }
}

/// Creates a TLS client configuration on the ring provider.
///
/// Mozilla's roots are trusted unless `insecure` is set, in which case the
/// server certificate is accepted as presented. The identity, when given, is
/// offered for client authentication.
pub fn create_tls_config(
    identity: Option<&ClientIdentity>,
    insecure: bool,
) -> Result<Arc<ClientConfig>, TlsError> {
    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = if insecure {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier { provider }))
    } else {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(root_store)
    };

    let config = match identity {
        Some(identity) => {
            let (chain, key) = identity.to_parts();
            builder.with_client_auth_cert(chain, key)?
        }
        None => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

/// Establishes a TLS connection over an existing TCP stream.
pub async fn connect_tls<P: TlsProvider>(
    provider: &P,
    tcp_stream: TcpStream,
    server_name: &str,
) -> Result<TlsStream<TcpStream>, TlsError> {
    let connector = provider.connector();

    let name = ServerName::try_from(server_name.to_string()).map_err(|_| {
        TlsError::InvalidServerName {
            host: server_name.to_string(),
        }
    })?;

    connector
        .connect(name, tcp_stream)
        .await
        .map_err(|source| TlsError::Handshake {
            host: server_name.to_string(),
            source,
        })
}

/// Accepts any server certificate; handshake signatures are still checked.
#[derive(Debug)]
struct NoVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for NoVerifier {
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
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::client_cert::read_client_cert;
    use rustls::client::ResolvesClientCert;

    const CLIENT_BUNDLE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/client_bundle.pem"
    );

    #[test]
    fn test_config_without_client_auth() {
        let config = create_tls_config(None, false).unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_config_with_client_identity() {
        let identity = read_client_cert(CLIENT_BUNDLE).unwrap().unwrap();
        let config = create_tls_config(Some(&identity), false).unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_insecure_provider() {
        let provider = RustlsTlsProvider::new(None, true).unwrap();
        assert!(!provider.client_config().client_auth_cert_resolver.has_certs());
    }
}
