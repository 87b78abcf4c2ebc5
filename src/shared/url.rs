//! Address normalization.
//!
//! Accepts bare `host[:port]/path` input as well as full URLs and always
//! produces a URL with a scheme.

use crate::config::{
    DEFAULT_HTTP_SCHEME, DOUBLE_SLASH, HTTP_LISTEN_PORT_SUFFIX, SECURE_HTTP_SCHEME,
};
use crate::error::UrlError;
use std::fmt;
use url::Url;

/// A parsed address with a non-empty scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    scheme: String,
    /// Authority as written by the user, port included, userinfo stripped.
    host: String,
    url: Url,
}

impl NormalizedUrl {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `host[:port]` exactly as given; `:80` is not folded away.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn is_https(&self) -> bool {
        self.scheme == SECURE_HTTP_SCHEME
    }

    /// Path plus query, as sent on the request line.
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// Host name without port or IPv6 brackets, for DNS and SNI.
    pub fn host_name(&self) -> &str {
        self.url.host_str().map(strip_brackets).unwrap_or_default()
    }

    /// Explicit port, or the scheme's default.
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Normalizes a user supplied address.
///
/// Without `://` the input is read as `//authority/path`. A missing scheme
/// becomes `http` when the host ends in `:80` and `https` otherwise, a bare
/// host included.
pub fn parse_url(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let uri = if !raw.contains("://") && !raw.starts_with(DOUBLE_SLASH) {
        format!("{}{}", DOUBLE_SLASH, raw)
    } else {
        raw.to_string()
    };

    let (scheme, rest) = split_scheme(&uri)?;
    let authority = rest
        .find(['/', '?', '#'])
        .map_or(rest, |end| &rest[..end]);
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, h)| h)
        .to_string();

    let scheme = match scheme {
        Some(s) => s,
        None if host.ends_with(HTTP_LISTEN_PORT_SUFFIX) => DEFAULT_HTTP_SCHEME.to_string(),
        None => SECURE_HTTP_SCHEME.to_string(),
    };

    let url = Url::parse(&format!("{}://{}", scheme, rest)).map_err(|source| UrlError::Parse {
        url: uri.clone(),
        source,
    })?;

    Ok(NormalizedUrl { scheme, host, url })
}

/// Splits `scheme://rest` or `//rest`. The scheme is lower-cased.
fn split_scheme(uri: &str) -> Result<(Option<String>, &str), UrlError> {
    if let Some(rest) = uri.strip_prefix(DOUBLE_SLASH) {
        return Ok((None, rest));
    }

    let (scheme, rest) = uri.split_once("://").ok_or_else(|| UrlError::Malformed {
        url: uri.to_string(),
        reason: "missing protocol scheme",
    })?;

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(UrlError::Malformed {
            url: uri.to_string(),
            reason: "first path segment in URL cannot contain colon",
        });
    }

    Ok((Some(scheme.to_ascii_lowercase()), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_80_stays_http() {
        let url = parse_url("example.com:80").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "example.com:80");
        assert_eq!(url.port(), 80);
    }

    #[test]
    fn test_bare_host_upgrades_to_https() {
        let url = parse_url("example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), 443);
    }

    #[test]
    fn test_other_port_upgrades_to_https() {
        let url = parse_url("localhost:8080/status?verbose=1").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "localhost:8080");
        assert_eq!(url.path(), "/status");
        assert_eq!(url.query(), Some("verbose=1"));
        assert_eq!(url.request_uri(), "/status?verbose=1");
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let url = parse_url("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host(), "example.com");

        let url = parse_url("HTTPS://example.com:80/").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_double_slash_prefix() {
        let url = parse_url("//example.com:80/a").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.path(), "/a");
    }

    #[test]
    fn test_userinfo_is_not_part_of_host() {
        let url = parse_url("user:pw@example.com:80/").unwrap();
        assert_eq!(url.host(), "example.com:80");
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_ipv6_host_name() {
        let url = parse_url("[::1]:8443/").unwrap();
        assert_eq!(url.host(), "[::1]:8443");
        assert_eq!(url.host_name(), "::1");
        assert_eq!(url.port(), 8443);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            parse_url("example.com:notaport"),
            Err(UrlError::Parse { .. })
        ));
        assert!(matches!(
            parse_url("1http://example.com"),
            Err(UrlError::Malformed { .. })
        ));
    }
}
