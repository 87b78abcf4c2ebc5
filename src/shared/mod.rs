//! Request and response building blocks.
//!
//! Certificate loading, URL normalization, header parsing, request bodies,
//! response capture and certificate summaries. Nothing here touches the
//! network.

pub mod body;
pub mod capture;
pub mod client_cert;
pub mod headers;
pub mod peer_cert;
pub mod url;

pub use capture::{capture_response, is_redirect, CaptureOptions, CaptureOutcome};
pub use client_cert::{read_client_cert, ClientIdentity, LabelPolicy};
pub use headers::{header_key_value, HeaderLine, HeaderList};
pub use url::{parse_url, NormalizedUrl};
