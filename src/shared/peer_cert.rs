//! X.509 certificate summaries.
//!
//! Extracts the fields worth printing from the server certificate of a TLS
//! connection, and from a loaded client certificate.

use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::net::TcpStream;
use x509_parser::prelude::*;

/// Fields of one certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertSummary {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    /// Unix timestamps.
    pub not_before: Option<i64>,
    pub not_after: Option<i64>,
    pub san: Vec<String>,
}

/// Negotiated parameters of a TLS session plus the leaf certificate.
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    pub protocol: String,
    pub cipher: String,
    pub certificate: CertSummary,
}

/// Parses DER certificate data. Anything unparseable stays `None`/empty.
pub fn summarize_der(der: &[u8]) -> CertSummary {
    let Ok((_, cert)) = X509Certificate::from_der(der) else {
        return CertSummary::default();
    };

    let common_name_or_full = |name: &X509Name| {
        name.iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(|s| s.to_string())
            .or_else(|| Some(name.to_string()))
    };

    let mut summary = CertSummary {
        subject: common_name_or_full(cert.subject()),
        issuer: common_name_or_full(cert.issuer()),
        not_before: Some(cert.validity().not_before.timestamp()),
        not_after: Some(cert.validity().not_after.timestamp()),
        san: Vec::new(),
    };

    if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => summary.san.push(dns.to_string()),
                GeneralName::IPAddress(ip) => match ip.len() {
                    4 => summary
                        .san
                        .push(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]).to_string()),
                    16 => {
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(ip);
                        summary.san.push(Ipv6Addr::from(octets).to_string());
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    summary
}

/// Reads the session parameters and leaf certificate off a TLS stream.
pub fn peer_certificate(
    conn: &tokio_rustls::client::TlsStream<TcpStream>,
) -> Option<PeerCertificate> {
    let (_, client_conn) = conn.get_ref();

    let protocol = match client_conn.protocol_version() {
        Some(rustls::ProtocolVersion::TLSv1_2) => "TLS 1.2".to_string(),
        Some(rustls::ProtocolVersion::TLSv1_3) => "TLS 1.3".to_string(),
        _ => "TLS".to_string(),
    };

    let cipher = client_conn
        .negotiated_cipher_suite()
        .map(|cs| format!("{:?}", cs.suite()))
        .unwrap_or_else(|| "Unknown".to_string());

    let leaf = client_conn.peer_certificates()?.first()?;

    Some(PeerCertificate {
        protocol,
        cipher,
        certificate: summarize_der(leaf.as_ref()),
    })
}
