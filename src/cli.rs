//! Command line flags.

use crate::error::AppError;
use crate::infra::dialer::NetworkFamily;
use crate::request::StatRequest;
use crate::shared::body::BodySource;
use crate::shared::capture::CaptureOptions;
use crate::shared::client_cert::read_client_cert;
use crate::shared::headers::{HeaderLine, HeaderList};
use crate::shared::url::parse_url;
use clap::Parser;
use hyper::Method;
use std::path::PathBuf;

/// Visualizes an HTTP request: connection, TLS, status and headers.
#[derive(Debug, Parser)]
#[command(name = "http-stat", disable_version_flag = true)]
#[command(about = "HTTP request diagnostics in the terminal", long_about = None)]
pub struct Cli {
    /// Target address; the scheme may be omitted.
    #[arg(required_unless_present = "version")]
    pub url: Option<String>,

    /// HTTP method (default GET, or POST when --data is given).
    #[arg(short = 'X', long = "request", value_name = "METHOD")]
    pub method: Option<Method>,

    /// Request header as `Key: Value`; repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<HeaderLine>,

    /// Request body, or `@file` to send a file's contents.
    #[arg(short = 'd', long = "data", value_name = "DATA")]
    pub data: Option<String>,

    /// Write the response body to FILE.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save the response body under the remote file name.
    #[arg(short = 'O', long = "remote-name")]
    pub remote_name: bool,

    /// Directory for remote file names.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// PEM bundle with the client certificate and private key.
    #[arg(short = 'E', long = "cert", value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Skip server certificate verification.
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Follow redirects.
    #[arg(short = 'L', long = "location")]
    pub location: bool,

    /// Resolve names to IPv4 addresses only.
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Resolve names to IPv6 addresses only.
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// Print version information and exit.
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Do not print the banner.
    #[arg(long)]
    pub no_banner: bool,
}

impl Cli {
    pub fn network(&self) -> NetworkFamily {
        if self.ipv4 {
            NetworkFamily::V4
        } else if self.ipv6 {
            NetworkFamily::V6
        } else {
            NetworkFamily::Any
        }
    }

    pub fn method(&self) -> Method {
        match (&self.method, &self.data) {
            (Some(method), _) => method.clone(),
            (None, Some(_)) => Method::POST,
            (None, None) => Method::GET,
        }
    }

    /// Normalizes the URL, loads the client certificate and assembles the
    /// request. Fails on the first invalid input.
    pub fn into_request(self) -> Result<StatRequest, AppError> {
        let raw_url = self
            .url
            .as_deref()
            .ok_or_else(|| AppError::InvalidRequest("missing URL".to_string()))?;
        let url = parse_url(raw_url)?;

        let client_identity = match &self.cert {
            Some(path) => read_client_cert(path)?,
            None => None,
        };

        let method = self.method();
        let network = self.network();

        Ok(StatRequest {
            url,
            method,
            headers: self.headers.into_iter().collect::<HeaderList>(),
            body: self.data.as_deref().map(BodySource::parse),
            client_identity,
            insecure: self.insecure,
            network,
            follow_redirects: self.location,
            capture: CaptureOptions {
                save_output: self.remote_name,
                output_file: self.output,
                output_dir: self.output_dir,
            },
        })
    }
}
