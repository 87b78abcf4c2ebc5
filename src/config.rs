use std::env;
use std::time::Duration;

/// Scheme assumed when the address carries none.
pub const DEFAULT_HTTP_SCHEME: &str = "http";
/// Scheme used when the host does not name the plain HTTP port.
pub const SECURE_HTTP_SCHEME: &str = "https";
/// Host suffix that keeps a scheme-less address on plain HTTP.
pub const HTTP_LISTEN_PORT_SUFFIX: &str = ":80";
pub const DOUBLE_SLASH: &str = "//";

/// PEM label prefix for PKCS#8 private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
/// PEM label prefix for X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Connect timeout applied by the dialer.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// TCP keep-alive interval applied to dialed sockets.
pub const HTTP_KEEP_ALIVE: Duration = Duration::from_secs(30);

pub const MAX_REDIRECTS: usize = 10;

/// Runtime settings that can be tuned from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub connect_timeout: Duration,
    pub keep_alive: Duration,
    pub max_redirects: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            connect_timeout: env::var("HTTP_STAT_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(HTTP_TIMEOUT),
            keep_alive: env::var("HTTP_STAT_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(HTTP_KEEP_ALIVE),
            max_redirects: env::var("HTTP_STAT_MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_REDIRECTS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: HTTP_TIMEOUT,
            keep_alive: HTTP_KEEP_ALIVE,
            max_redirects: MAX_REDIRECTS,
        }
    }
}
