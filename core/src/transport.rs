//! The network boundary.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. The engine hands it a
//! fully built `HttpRequest` and expects the raw response back, redirects
//! included: a transport must not follow redirects itself. Timeouts and
//! cancellation live here too; the engine never retries a transport error.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP exchange.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_impl::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_impl {
    use std::time::Duration;

    use tracing::debug;
    use url::Url;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use crate::options::ProxyConfig;

    /// Blocking transport backed by `ureq`.
    ///
    /// Status codes are returned as data (no error on 4xx/5xx) and ureq's own
    /// redirect handling is switched off. Response bodies are read whole,
    /// with no size cap unless `body_limit` sets one.
    #[derive(Debug, Clone, Default)]
    pub struct UreqTransport {
        timeout: Option<Duration>,
        body_limit: Option<u64>,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Upper bound for a whole exchange, connect to last body byte.
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        /// Fail with a transport error when a response body exceeds `bytes`.
        pub fn body_limit(mut self, bytes: u64) -> Self {
            self.body_limit = Some(bytes);
            self
        }

        fn agent(&self, proxy: Option<&ProxyConfig>) -> Result<ureq::Agent, TransportError> {
            let mut config = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .max_redirects(0)
                .timeout_global(self.timeout);
            if let Some(proxy) = proxy {
                let proxy_uri = format!("http://{}:{}", proxy.host, proxy.port);
                let proxy = ureq::Proxy::new(&proxy_uri)
                    .map_err(|e| TransportError::with_source(format!("invalid proxy {proxy_uri}"), e))?;
                config = config.proxy(Some(proxy));
            }
            Ok(config.build().new_agent())
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let agent = self.agent(request.proxy.as_ref())?;
            let uri = effective_uri(&request)?;
            let uri = uri.as_str();
            let body = request.body.as_deref();
            debug!(method = %request.method, %uri, tls = request.tls, "ureq send");

            let result = match request.method {
                HttpMethod::Get => send_without_body(agent.get(uri), &request.headers, body),
                HttpMethod::Delete => send_without_body(agent.delete(uri), &request.headers, body),
                HttpMethod::Head => send_without_body(agent.head(uri), &request.headers, body),
                HttpMethod::Post => send_with_body(agent.post(uri), &request.headers, body),
                HttpMethod::Put => send_with_body(agent.put(uri), &request.headers, body),
                HttpMethod::Patch => send_with_body(agent.patch(uri), &request.headers, body),
                HttpMethod::Options => {
                    return Err(TransportError::new("OPTIONS is not supported by UreqTransport"))
                }
            };
            let mut response =
                result.map_err(|e| TransportError::with_source(format!("{} {uri} failed", request.method), e))?;

            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body = response
                .body_mut()
                .with_config()
                .limit(self.body_limit.unwrap_or(u64::MAX))
                .read_to_vec()
                .map_err(|e| TransportError::with_source("failed to read response body", e))?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    /// Header values that are not valid UTF-8 are kept, lossily decoded.
    fn collect_headers(headers: &ureq::http::HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    /// Upgrade to `https` when the request asks for TLS.
    fn effective_uri(request: &HttpRequest) -> Result<Url, TransportError> {
        let mut uri = request.uri.clone();
        if request.tls && uri.scheme() == "http" {
            uri.set_scheme("https")
                .map_err(|()| TransportError::new(format!("cannot use TLS for {}", request.uri)))?;
        }
        Ok(uri)
    }

    fn with_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn send_without_body(
        builder: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let builder = with_headers(builder, headers);
        match body {
            Some(body) => builder.force_send_body().send(body),
            None => builder.call(),
        }
    }

    fn send_with_body(
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let builder = with_headers(builder, headers);
        match body {
            Some(body) => builder.send(body),
            None => builder.send_empty(),
        }
    }

}
