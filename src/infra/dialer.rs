//! Timeout-bound TCP dialing with an optional forced IP family.

use super::dns::{DnsResolver, HickoryDnsResolver};
use crate::config::{Config, HTTP_KEEP_ALIVE, HTTP_TIMEOUT};
use crate::error::DialError;
use socket2::{SockRef, TcpKeepalive};
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use tokio::{net::TcpStream, time::timeout};
use tokio_util::sync::CancellationToken;

/// IP family selector, spelled like `tcp`, `tcp4` and `tcp6`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkFamily {
    #[default]
    Any,
    V4,
    V6,
}

impl NetworkFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkFamily::Any => "tcp",
            NetworkFamily::V4 => "tcp4",
            NetworkFamily::V6 => "tcp6",
        }
    }

    pub fn permits(&self, ip: &IpAddr) -> bool {
        match self {
            NetworkFamily::Any => true,
            NetworkFamily::V4 => ip.is_ipv4(),
            NetworkFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl FromStr for NetworkFamily {
    type Err = DialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "tcp" => Ok(NetworkFamily::Any),
            "tcp4" => Ok(NetworkFamily::V4),
            "tcp6" => Ok(NetworkFamily::V6),
            other => Err(DialError::UnknownNetwork {
                network: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable dial settings, shared read-only by every connection attempt.
#[derive(Debug, Clone)]
pub struct DialPolicy<R = HickoryDnsResolver> {
    connect_timeout: Duration,
    keep_alive: Duration,
    family: NetworkFamily,
    resolver: R,
}

impl DialPolicy<HickoryDnsResolver> {
    /// Policy with the default timeout and keep-alive, forced to `network`.
    pub fn new(network: &str) -> Result<Self, DialError> {
        Ok(Self {
            connect_timeout: HTTP_TIMEOUT,
            keep_alive: HTTP_KEEP_ALIVE,
            family: network.parse()?,
            resolver: HickoryDnsResolver::new(),
        })
    }

    pub fn from_config(config: &Config, network: &str) -> Result<Self, DialError> {
        Ok(Self::new(network)?
            .with_connect_timeout(config.connect_timeout)
            .with_keep_alive(config.keep_alive))
    }
}

impl<R: DnsResolver> DialPolicy<R> {
    pub fn with_resolver<T: DnsResolver>(self, resolver: T) -> DialPolicy<T> {
        DialPolicy {
            connect_timeout: self.connect_timeout,
            keep_alive: self.keep_alive,
            family: self.family,
            resolver,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn family(&self) -> NetworkFamily {
        self.family
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connects to `addr` (`host:port`).
    ///
    /// The requested network is ignored in favor of the policy's family.
    /// Aborts with [`DialError::Cancelled`] as soon as `cancel` fires.
    pub async fn dial_context(
        &self,
        cancel: &CancellationToken,
        _network: &str,
        addr: &str,
    ) -> Result<TcpStream, DialError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DialError::Cancelled {
                addr: addr.to_string(),
            }),
            result = self.dial(addr) => result,
        }
    }

    /// Resolves and connects within the connect timeout, trying each
    /// permitted address in order. No retries beyond that.
    pub async fn dial(&self, addr: &str) -> Result<TcpStream, DialError> {
        let (host, port) = split_host_port(addr)?;

        let stream = match timeout(self.connect_timeout, self.connect_any(host, port, addr)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DialError::Timeout {
                    addr: addr.to_string(),
                    timeout: self.connect_timeout,
                })
            }
        };

        self.configure_socket(&stream);
        Ok(stream)
    }

    async fn connect_any(&self, host: &str, port: u16, addr: &str) -> Result<TcpStream, DialError> {
        let candidates: Vec<SocketAddr> = self
            .resolver
            .resolve(host)
            .await?
            .into_iter()
            .filter(|ip| self.family.permits(ip))
            .map(|ip| SocketAddr::new(ip, port))
            .collect();

        if candidates.is_empty() {
            return Err(DialError::NoAddress {
                addr: addr.to_string(),
                network: self.family.to_string(),
            });
        }

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect(candidate).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(addr = %candidate, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(DialError::Connect {
            addr: addr.to_string(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "no address tried")
            }),
        })
    }

    fn configure_socket(&self, stream: &TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "failed to set TCP_NODELAY");
        }
        let keepalive = TcpKeepalive::new()
            .with_time(self.keep_alive)
            .with_interval(self.keep_alive);
        if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
            tracing::warn!(error = %e, "failed to enable TCP keep-alive");
        }
    }
}

/// Splits `host:port`, unwrapping a bracketed IPv6 host.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), DialError> {
    let invalid = || DialError::InvalidAddress {
        addr: addr.to_string(),
    };
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let port = port.parse().map_err(|_| invalid())?;
    Ok((host, port))
}
