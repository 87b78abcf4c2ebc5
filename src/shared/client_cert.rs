//! TLS client certificate loading.
//!
//! Reads a PEM bundle, picks out one certificate block and one private key
//! block, and checks that they form a usable pair.

use crate::config::{CERTIFICATE_LABEL, PRIVATE_KEY_LABEL};
use crate::error::CertError;
use rustls::sign::CertifiedKey;
use rustls_pki_types::pem::{PemObject, SectionKind};
use rustls_pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Which PEM labels count as key or certificate material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Labels starting with `PRIVATE KEY` or `CERTIFICATE` only.
    ///
    /// Algorithm-qualified keys such as `RSA PRIVATE KEY` are skipped, and
    /// `CERTIFICATE REQUEST` is taken for a certificate.
    #[default]
    Legacy,
    /// Also accepts PKCS#1 (`RSA PRIVATE KEY`) and SEC1 (`EC PRIVATE KEY`) keys.
    Extended,
}

/// A decoded PEM block after classification.
#[derive(Debug)]
pub enum PemBlock {
    Key(PrivateKeyDer<'static>),
    Cert(CertificateDer<'static>),
    Other,
}

/// Armor label of a decoded section, e.g. `RSA PRIVATE KEY`.
pub fn section_label(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Certificate => "CERTIFICATE",
        SectionKind::PublicKey => "PUBLIC KEY",
        SectionKind::RsaPrivateKey => "RSA PRIVATE KEY",
        SectionKind::PrivateKey => "PRIVATE KEY",
        SectionKind::EcPrivateKey => "EC PRIVATE KEY",
        SectionKind::Crl => "X509 CRL",
        SectionKind::Csr => "CERTIFICATE REQUEST",
        _ => "",
    }
}

impl LabelPolicy {
    pub fn classify(self, kind: SectionKind, der: Vec<u8>) -> PemBlock {
        match self {
            LabelPolicy::Legacy => {
                let label = section_label(kind);
                if label.starts_with(PRIVATE_KEY_LABEL) {
                    PemBlock::Key(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)))
                } else if label.starts_with(CERTIFICATE_LABEL) {
                    PemBlock::Cert(CertificateDer::from(der))
                } else {
                    PemBlock::Other
                }
            }
            LabelPolicy::Extended => match kind {
                SectionKind::PrivateKey => {
                    PemBlock::Key(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)))
                }
                SectionKind::RsaPrivateKey => {
                    PemBlock::Key(PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)))
                }
                SectionKind::EcPrivateKey => {
                    PemBlock::Key(PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)))
                }
                SectionKind::Certificate => PemBlock::Cert(CertificateDer::from(der)),
                _ => PemBlock::Other,
            },
        }
    }
}

/// A certificate and the private key that signs for it.
#[derive(Debug)]
pub struct ClientIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }

    /// Clones the chain and key, e.g. to hand them to a `ClientConfig`.
    pub fn to_parts(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        (self.cert_chain.clone(), self.key.clone_key())
    }
}

/// Loads the client certificate at `path` with [`LabelPolicy::Legacy`].
///
/// An empty path means no client certificate and yields `Ok(None)`.
pub fn read_client_cert(path: impl AsRef<Path>) -> Result<Option<ClientIdentity>, CertError> {
    read_client_cert_with(path, LabelPolicy::default())
}

pub fn read_client_cert_with(
    path: impl AsRef<Path>,
    policy: LabelPolicy,
) -> Result<Option<ClientIdentity>, CertError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Ok(None);
    }

    let bytes = fs::read(path).map_err(|source| CertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bundle(&bytes, policy, path).map(Some)
}

/// Scans every PEM block in `bytes`. Later blocks of a kind replace earlier
/// ones; chains are not aggregated.
fn parse_bundle(
    bytes: &[u8],
    policy: LabelPolicy,
    path: &Path,
) -> Result<ClientIdentity, CertError> {
    let mut key: Option<PrivateKeyDer<'static>> = None;
    let mut cert: Option<CertificateDer<'static>> = None;

    for section in <(SectionKind, Vec<u8>) as PemObject>::pem_slice_iter(bytes) {
        let (kind, der) = section.map_err(|e| CertError::Pem {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        match policy.classify(kind, der) {
            PemBlock::Key(k) => key = Some(k),
            PemBlock::Cert(c) => cert = Some(c),
            PemBlock::Other => {
                tracing::debug!(filename = %path.display(), kind = ?kind, "skipping PEM block");
            }
        }
    }

    let key = key.ok_or_else(|| CertError::MissingKey {
        path: PathBuf::from(path),
    })?;
    let cert = cert.ok_or_else(|| CertError::MissingCertificate {
        path: PathBuf::from(path),
    })?;

    let cert_chain = vec![cert];
    let provider = rustls::crypto::ring::default_provider();
    CertifiedKey::from_der(cert_chain.clone(), key.clone_key(), &provider).map_err(|source| {
        CertError::KeyPair {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(ClientIdentity { cert_chain, key })
}
