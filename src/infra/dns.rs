//! DNS resolution infrastructure.
//!
//! Provides a trait-based abstraction for DNS resolution so the dialer can
//! be exercised without touching the network.

use crate::error::DialError;
use hickory_resolver::{config::*, TokioAsyncResolver};
use std::{net::IpAddr, sync::Arc};
use tokio::sync::OnceCell;

/// Trait for DNS resolution.
#[allow(async_fn_in_trait)]
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname to a non-empty list of IP addresses.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DialError>;
}

/// Process-wide resolver, built on first lookup.
static DNS_RESOLVER: OnceCell<Arc<TokioAsyncResolver>> = OnceCell::const_new();

/// Uses the host's resolver configuration, falling back to hickory's
/// defaults when it cannot be read.
async fn get_resolver() -> Arc<TokioAsyncResolver> {
    DNS_RESOLVER
        .get_or_init(|| async {
            let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
                tracing::debug!(error = %e, "system resolver config unavailable, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            });
            Arc::new(resolver)
        })
        .await
        .clone()
}

/// DNS resolver implementation using hickory-resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct HickoryDnsResolver;

impl HickoryDnsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DialError> {
        // Literal addresses skip the lookup.
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let resolver = get_resolver().await;
        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| DialError::Resolve {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(DialError::Resolve {
                host: host.to_string(),
                message: "DNS lookup returned no addresses".to_string(),
            });
        }
        tracing::debug!(host, count = ips.len(), "resolved host");
        Ok(ips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ip_address() {
        let resolver = HickoryDnsResolver::new();
        let ips = resolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(ips.len(), 1);
        assert_eq!(ips[0].to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_resolve_ipv6_address() {
        let resolver = HickoryDnsResolver::new();
        let ips = resolver.resolve("::1").await.unwrap();
        assert_eq!(ips.len(), 1);
        assert_eq!(ips[0].to_string(), "::1");
    }
}
