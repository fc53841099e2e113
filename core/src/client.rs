//! Execution and redirect engine.
//!
//! # Design
//! `Client` owns a transport, a signer and a decoder registry, and nothing
//! else: every call to `perform` consumes its own `RequestDescriptor`, so no
//! state is shared between requests. The loop sends once per iteration and
//! classifies the response into one of three outcomes. A redirect produces a
//! new descriptor with a smaller budget and goes around again; validation of
//! that descriptor is what ends an endless redirect chain.

use tracing::{debug, info, warn};

use crate::builder;
use crate::decode::{Decoded, DecoderRegistry};
use crate::error::{Error, HttpError, Result};
use crate::http::{HttpMethod, StatusClass};
use crate::options::RequestOptions;
use crate::request::RequestDescriptor;
use crate::signing::{OAuth1Signer, Signer};
use crate::transport::Transport;

#[derive(Debug)]
pub struct Client<T, S = OAuth1Signer> {
    transport: T,
    signer: S,
    decoders: DecoderRegistry,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            signer: OAuth1Signer,
            decoders: DecoderRegistry::default(),
        }
    }
}

impl<T: Transport, S: Signer> Client<T, S> {
    pub fn with_signer<S2: Signer>(self, signer: S2) -> Client<T, S2> {
        Client {
            transport: self.transport,
            signer,
            decoders: self.decoders,
        }
    }

    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn decoders_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.decoders
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get(&self, uri: &str, options: RequestOptions) -> Result<Decoded> {
        self.request(HttpMethod::Get, uri, options)
    }

    pub fn post(&self, uri: &str, options: RequestOptions) -> Result<Decoded> {
        self.request(HttpMethod::Post, uri, options)
    }

    pub fn put(&self, uri: &str, options: RequestOptions) -> Result<Decoded> {
        self.request(HttpMethod::Put, uri, options)
    }

    pub fn delete(&self, uri: &str, options: RequestOptions) -> Result<Decoded> {
        self.request(HttpMethod::Delete, uri, options)
    }

    pub fn request(&self, method: HttpMethod, uri: &str, options: RequestOptions) -> Result<Decoded> {
        self.perform(RequestDescriptor::new(method, uri, options)?)
    }

    /// Send the request, following redirects until a final response or an
    /// exhausted budget.
    ///
    /// A redirect re-sends with the same method, headers and body, whatever
    /// the 3xx code.
    pub fn perform(&self, mut descriptor: RequestDescriptor) -> Result<Decoded> {
        loop {
            let request = builder::build(&descriptor, &self.signer)?;
            debug!(
                method = %request.method,
                uri = %request.uri,
                redirects_left = descriptor.options().redirect_limit,
                "sending request"
            );
            let response = self.transport.send(request)?;

            if descriptor.format().is_none() {
                if let Some(format) = response.content_type().and_then(|ct| self.decoders.sniff(ct)) {
                    descriptor = descriptor.with_format(format);
                }
            }

            match response.class() {
                StatusClass::Success => {
                    debug!(status = response.status, "request succeeded");
                    return Ok(self.decoders.decode(&response.body, descriptor.format())?);
                }
                StatusClass::Redirection => {
                    let location = response.location().ok_or(Error::MissingLocation {
                        status: response.status,
                    })?;
                    info!(status = response.status, location, "following redirect");
                    descriptor = descriptor.redirected(location)?;
                }
                StatusClass::Error => {
                    warn!(status = response.status, "request failed");
                    let decoded = self.decoders.decode(&response.body, descriptor.format()).ok();
                    return Err(HttpError {
                        status: response.status,
                        headers: response.headers,
                        body: response.body,
                        decoded,
                    }
                    .into());
                }
            }
        }
    }
}
