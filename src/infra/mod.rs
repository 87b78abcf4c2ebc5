//! Infrastructure layer providing abstractions for external dependencies.
//!
//! This module contains traits and implementations for:
//! - DNS resolution
//! - Dialing TCP connections
//! - TLS/SSL connections
//!
//! The resolver and TLS provider sit behind traits so the dialer and the
//! request driver can be exercised with stand-ins.

pub mod dialer;
pub mod dns;
pub mod tls;

pub use dialer::{DialPolicy, NetworkFamily};
pub use dns::{DnsResolver, HickoryDnsResolver};
pub use tls::{connect_tls, create_tls_config, RustlsTlsProvider, TlsProvider};
