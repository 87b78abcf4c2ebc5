use crate::error::CaptureError;
use crate::infra::dialer::NetworkFamily;
use crate::shared::body::BodySource;
use crate::shared::capture::{CaptureOptions, CaptureOutcome};
use crate::shared::client_cert::ClientIdentity;
use crate::shared::headers::HeaderList;
use crate::shared::peer_cert::PeerCertificate;
use crate::shared::url::NormalizedUrl;
use hyper::{Method, StatusCode, Version};
use std::net::SocketAddr;

/// Everything needed to issue one diagnostic request.
#[derive(Debug)]
pub struct StatRequest {
    pub url: NormalizedUrl,
    pub method: Method,
    pub headers: HeaderList,
    pub body: Option<BodySource>,
    pub client_identity: Option<ClientIdentity>,
    /// Skip server certificate verification.
    pub insecure: bool,
    pub network: NetworkFamily,
    pub follow_redirects: bool,
    pub capture: CaptureOptions,
}

impl StatRequest {
    /// A plain GET with no extras.
    pub fn new(url: NormalizedUrl) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderList::new(),
            body: None,
            client_identity: None,
            insecure: false,
            network: NetworkFamily::Any,
            follow_redirects: false,
            capture: CaptureOptions::default(),
        }
    }
}

/// One request/response exchange.
#[derive(Debug)]
pub struct HopReport {
    pub url: String,
    pub remote_addr: Option<SocketAddr>,
    pub tls: Option<PeerCertificate>,
    pub version: Version,
    pub status: StatusCode,
    /// Response headers in display order.
    pub headers: HeaderList,
}

/// Result of a full run, redirects included.
#[derive(Debug)]
pub struct StatReport {
    pub hops: Vec<HopReport>,
    /// Capture problems are reported here rather than failing the run.
    pub capture: Result<CaptureOutcome, CaptureError>,
}

impl StatReport {
    pub fn final_hop(&self) -> Option<&HopReport> {
        self.hops.last()
    }
}

/// Converts an HTTP version to its string representation.
pub fn version_to_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}
