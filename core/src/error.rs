//! Error types for the request executor.
//!
//! # Design
//! Validation failures (`RedirectionTooDeep`, `UnsupportedMethod`,
//! `InvalidOption`, `InvalidUri`) are always raised before any I/O. A non-2xx,
//! non-3xx response lands in `HttpError` together with the raw body and, when
//! the body could be decoded, the decoded value. Transport failures are
//! wrapped without being inspected or retried.

use thiserror::Error;

use crate::decode::{Decoded, Format};
use crate::http::HttpMethod;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `Client::perform` and the pipeline stages it drives.
#[derive(Debug, Error)]
pub enum Error {
    /// The redirect budget is spent, or was configured as zero.
    #[error("HTTP redirects too deep")]
    RedirectionTooDeep,

    #[error("only GET, POST, PUT and DELETE are supported, got {0}")]
    UnsupportedMethod(HttpMethod),

    /// An option has the wrong shape, e.g. a string `query` on a POST.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid URI `{uri}`: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// A 3xx response arrived without a `Location` header.
    #[error("HTTP {status} redirect without a Location header")]
    MissingLocation { status: u16 },

    #[error(transparent)]
    Http(Box<HttpError>),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Http(Box::new(err))
    }
}

/// A response outside the 2xx and 3xx ranges.
#[derive(Debug, Error)]
#[error("HTTP {status}")]
pub struct HttpError {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// The body run through the response format's decoder, if that worked.
    pub decoded: Option<Decoded>,
}

impl HttpError {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A body could not be decoded with the requested format.
#[derive(Debug, Error)]
#[error("failed to parse {format} body: {message}")]
pub struct ParseError {
    pub format: Format,
    pub message: String,
}

impl ParseError {
    pub fn new(format: Format, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
