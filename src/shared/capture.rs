//! Response body capture.
//!
//! Decides whether a response body is discarded or written to disk, and
//! where. The caller owns presentation of the outcome.

use crate::error::CaptureError;
use hyper::header::{HeaderMap, CONTENT_DISPOSITION};
use hyper::{Method, Request, Response, StatusCode};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Save flags taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Save under the remote name (`Content-Disposition` or URL path).
    pub save_output: bool,
    /// Explicit destination; wins over the remote name when non-empty.
    pub output_file: Option<PathBuf>,
    /// Directory that remote names are resolved against.
    pub output_dir: Option<PathBuf>,
}

impl CaptureOptions {
    fn explicit_file(&self) -> Option<&Path> {
        self.output_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn wants_file(&self) -> bool {
        self.save_output || self.explicit_file().is_some()
    }
}

/// What happened to the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Redirect or HEAD: the body was never read.
    Skipped,
    Discarded,
    Written(PathBuf),
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureOutcome::Skipped => Ok(()),
            CaptureOutcome::Discarded => f.write_str("Body discarded"),
            CaptureOutcome::Written(_) => f.write_str("Body read"),
        }
    }
}

/// Status 300 through 399.
pub fn is_redirect(status: StatusCode) -> bool {
    status.as_u16() > 299 && status.as_u16() < 400
}

/// Filename suggested by an `attachment` `Content-Disposition` header.
pub fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let (media_type, params) = parse_media_type(value)?;
    if media_type != "attachment" {
        return None;
    }

    let encoded = params
        .iter()
        .find(|(name, _)| name == "filename*")
        .and_then(|(_, v)| decode_ext_value(v));
    let plain = params
        .iter()
        .find(|(name, _)| name == "filename")
        .map(|(_, v)| v.clone());

    encoded.or(plain).filter(|name| !name.is_empty())
}

/// Last element of a slash separated path. `""` gives `.`, a path of only
/// slashes gives `/`.
pub fn path_base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Consumes the response body according to `options`.
///
/// Nothing is read for redirects and HEAD requests. Without save flags the
/// body is drained into a sink. Otherwise the destination is created and the
/// body copied into it; the file is closed on every path out.
pub fn capture_response<B, R: Read>(
    options: &CaptureOptions,
    request: &Request<B>,
    response: Response<R>,
) -> Result<CaptureOutcome, CaptureError> {
    if is_redirect(response.status()) || request.method() == Method::HEAD {
        return Ok(CaptureOutcome::Skipped);
    }

    let (parts, mut body) = response.into_parts();

    if !options.wants_file() {
        // Read errors while draining are of no interest.
        let _ = io::copy(&mut body, &mut io::sink());
        return Ok(CaptureOutcome::Discarded);
    }

    let path = match options.explicit_file() {
        Some(explicit) => explicit.to_path_buf(),
        None => {
            let name = filename_from_headers(&parts.headers)
                .and_then(|name| safe_file_name(&name))
                .unwrap_or_else(|| path_base(request.uri().path()).to_string());
            if name == "/" {
                tracing::info!(
                    "No remote filename; specify output filename with -o to save response body"
                );
            }
            match &options.output_dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        }
    };

    let mut file = File::create(&path).map_err(|source| CaptureError::Create {
        path: path.clone(),
        source,
    })?;
    io::copy(&mut body, &mut file).map_err(|source| CaptureError::Copy {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(filename = %path.display(), "response body written");
    Ok(CaptureOutcome::Written(path))
}

/// Drops any directory part a server put into the suggested name.
fn safe_file_name(name: &str) -> Option<String> {
    let base = Path::new(name).file_name()?.to_str()?;
    (!base.is_empty()).then(|| base.to_string())
}

/// Splits `type; k=v; k2="v 2"` into a lower-cased media type and
/// lower-cased parameter names. Quoted values may contain `;`.
pub fn parse_media_type(value: &str) -> Option<(String, Vec<(String, String)>)> {
    let mut segments = split_unquoted(value, ';').into_iter();
    let media_type = segments.next()?.trim().to_ascii_lowercase();
    if media_type.is_empty() || media_type.contains(char::is_whitespace) {
        return None;
    }

    let mut params = Vec::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (name, raw) = segment.split_once('=')?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || params.iter().any(|(n, _): &(String, String)| *n == name) {
            return None;
        }
        params.push((name, unquote(raw.trim())));
    }
    Some((media_type, params))
}

fn split_unquoted(value: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
    else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decodes an RFC 5987 `charset'lang'percent-encoded` value. Only UTF-8
/// and US-ASCII charsets are understood.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.to_ascii_lowercase();
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    if charset != "utf-8" && charset != "us-ascii" {
        return None;
    }

    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
