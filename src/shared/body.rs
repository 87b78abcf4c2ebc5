//! Request body sources: literal text or `@file`.

use crate::error::BodyError;
use futures::TryStreamExt;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

/// Body type sent on the wire.
pub type RequestBody = BoxBody<Bytes, io::Error>;

/// Where the request body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Literal(String),
    /// Contents of a file, given on the command line as `@path`.
    File(PathBuf),
}

impl BodySource {
    pub fn parse(data: &str) -> Self {
        match data.strip_prefix('@') {
            Some(path) => BodySource::File(PathBuf::from(path)),
            None => BodySource::Literal(data.to_string()),
        }
    }

    /// Opens the source. Files are streamed, not buffered, and closed once
    /// the stream is exhausted or fails.
    pub async fn open(&self) -> Result<RequestBody, BodyError> {
        match self {
            BodySource::Literal(text) => Ok(Full::new(Bytes::from(text.clone()))
                .map_err(|never| match never {})
                .boxed()),
            BodySource::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| BodyError::Open {
                        path: path.clone(),
                        source,
                    })?;
                let frames = ReaderStream::new(file).map_ok(Frame::data);
                Ok(StreamBody::new(frames).boxed())
            }
        }
    }
}

pub fn empty_body() -> RequestBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}
