//! Configurable HTTP request executor.
//!
//! # Overview
//! Given a method, a target URI and a `RequestOptions` bag, `Client` builds a
//! single request, sends it through a `Transport`, follows redirects up to a
//! bounded budget, and decodes the final body according to a declared or
//! sniffed `Format`.
//!
//! # Design
//! - `request::RequestDescriptor` resolves the absolute URI and query string.
//! - `builder` validates the descriptor and produces a plain-data
//!   `HttpRequest` with body, headers and authentication attached.
//! - `client::Client::perform` is the send / classify / redirect loop.
//! - `decode::DecoderRegistry` maps format tags to decoders and MIME types.
//! - The network (`transport::Transport`) and OAuth signing
//!   (`signing::Signer`) are traits; `UreqTransport` and `OAuth1Signer` are
//!   the shipped implementations.

pub mod builder;
pub mod client;
pub mod decode;
pub mod error;
pub mod http;
pub mod options;
pub mod request;
pub mod signing;
pub mod transport;

pub use client::Client;
pub use decode::{Decoded, Decoder, DecoderRegistry, Format};
pub use error::{Error, HttpError, ParseError, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, StatusClass};
pub use options::{BasicAuth, Body, ProxyConfig, Query, RequestOptions, SignedAuth};
pub use request::{RequestDescriptor, Target};
pub use signing::{OAuth1Signer, SignatureMethod, Signer, SigningContext};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
