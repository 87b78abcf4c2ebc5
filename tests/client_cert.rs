use http_stat::error::CertError;
use http_stat::shared::client_cert::{read_client_cert, read_client_cert_with, LabelPolicy};
use http_stat::shared::peer_cert::summarize_der;
use rustls_pki_types::PrivateKeyDer;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn pkcs8_bundle_loads() {
    let identity = read_client_cert(fixture("client_bundle.pem"))
        .unwrap()
        .expect("identity");
    assert_eq!(identity.cert_chain.len(), 1);
    assert!(matches!(identity.key(), PrivateKeyDer::Pkcs8(_)));
}

#[test]
fn rsa_bundle_needs_extended_policy() {
    let err = read_client_cert(fixture("client_rsa_bundle.pem")).unwrap_err();
    assert!(matches!(err, CertError::MissingKey { .. }));

    let identity = read_client_cert_with(fixture("client_rsa_bundle.pem"), LabelPolicy::Extended)
        .unwrap()
        .expect("identity");
    assert!(matches!(identity.key(), PrivateKeyDer::Pkcs1(_)));
    let summary = summarize_der(identity.cert_chain[0].as_ref());
    assert_eq!(summary.subject.as_deref(), Some("httpstat-rsa"));
}

#[test]
fn sec1_bundle_needs_extended_policy() {
    let err = read_client_cert(fixture("client_sec1_bundle.pem")).unwrap_err();
    assert!(matches!(err, CertError::MissingKey { .. }));

    let identity = read_client_cert_with(fixture("client_sec1_bundle.pem"), LabelPolicy::Extended)
        .unwrap()
        .expect("identity");
    assert!(matches!(identity.key(), PrivateKeyDer::Sec1(_)));
}

#[test]
fn mismatched_key_is_rejected() {
    let err = read_client_cert(fixture("mismatched_bundle.pem")).unwrap_err();
    assert!(matches!(err, CertError::KeyPair { .. }));
    assert!(err.to_string().contains("mismatched_bundle.pem"));
}

#[test]
fn last_certificate_block_wins() {
    let identity = read_client_cert(fixture("last_cert_wins_bundle.pem"))
        .unwrap()
        .expect("identity");
    let summary = summarize_der(identity.cert_chain[0].as_ref());
    assert_eq!(summary.subject.as_deref(), Some("httpstat-client"));

    // The matching certificate comes first here and is replaced.
    let err = read_client_cert(fixture("stale_cert_bundle.pem")).unwrap_err();
    assert!(matches!(err, CertError::KeyPair { .. }));
}

#[test]
fn certificate_without_key() {
    let err = read_client_cert(fixture("cert_only.pem")).unwrap_err();
    assert!(matches!(err, CertError::MissingKey { .. }));
}
