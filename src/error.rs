use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while turning a PEM bundle into a client identity.
#[derive(Error, Debug)]
pub enum CertError {
    #[error("failed to read http client certificate {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed PEM data in {}: {message}", path.display())]
    Pem { path: PathBuf, message: String },

    #[error("no private key block found in {}", path.display())]
    MissingKey { path: PathBuf },

    #[error("no certificate block found in {}", path.display())]
    MissingCertificate { path: PathBuf },

    #[error("unable to load client cert and key pair from {}: {source}", path.display())]
    KeyPair {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },
}

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("could not parse url {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not parse url {url}: {reason}")]
    Malformed { url: String, reason: &'static str },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header has invalid format, missing ':': {header}")]
    MissingColon { header: String },
}

#[derive(Error, Debug)]
pub enum DialError {
    #[error("unknown network {network}")]
    UnknownNetwork { network: String },

    #[error("invalid address {addr}: missing port")]
    InvalidAddress { addr: String },

    #[error("lookup {host} failed: {message}")]
    Resolve { host: String, message: String },

    #[error("no {network} address found for {addr}")]
    NoAddress { addr: String, network: String },

    #[error("dial {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("dial {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("dial {addr}: operation was canceled")]
    Cancelled { addr: String },
}

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("invalid server name {host}")]
    InvalidServerName { host: String },

    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),

    #[error("TLS handshake with {host} failed: {source}")]
    Handshake {
        host: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("failed to open data file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while persisting a response body. Creation and copy are kept
/// apart so callers can tell "nothing written" from "partially written".
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("unable to create file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read response body into {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level error surfaced by the request driver.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Cert(#[from] CertError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Dial(#[from] DialError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid redirect location {location}")]
    InvalidLocation { location: String },

    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),

    #[error("request to {url} was canceled")]
    Cancelled { url: String },

    #[error("response capture task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Short machine-friendly code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Cert(_) => "CLIENT_CERT",
            AppError::Url(_) => "INVALID_URL",
            AppError::Header(_) => "INVALID_HEADER",
            AppError::Dial(DialError::Timeout { .. }) => "TIMEOUT",
            AppError::Dial(DialError::Cancelled { .. }) => "CANCELLED",
            AppError::Dial(DialError::Resolve { .. }) => "DNS_ERROR",
            AppError::Dial(_) => "CONNECTION_FAILED",
            AppError::Tls(_) => "TLS_ERROR",
            AppError::Body(_) => "BODY_ERROR",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::InvalidRequest(_) => "REQUEST_BUILD_ERROR",
            AppError::InvalidLocation { .. } => "INVALID_REDIRECT",
            AppError::TooManyRedirects(_) => "TOO_MANY_REDIRECTS",
            AppError::Cancelled { .. } => "CANCELLED",
            AppError::Task(_) => "INTERNAL",
        }
    }
}
