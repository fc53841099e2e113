//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! builder produces `HttpRequest` values and the engine classifies
//! `HttpResponse` values; only a `Transport` implementation ever touches the
//! network. This keeps the pipeline deterministic and easy to test with a
//! scripted transport.
//!
//! All fields use owned types (`String`, `Vec`, `Url`) so a request can be
//! moved into a transport without lifetime concerns.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::error::Error;
use crate::options::ProxyConfig;

/// HTTP method for a request.
///
/// Only GET, POST, PUT and DELETE pass validation; the remaining variants
/// exist so callers can express them and get a typed rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether the executor is willing to send this method.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            HttpMethod::Get | HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(Error::InvalidOption(format!("unknown HTTP method `{other}`"))),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `builder::build`. A `Transport` executes it and returns the
/// corresponding `HttpResponse`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Connect over TLS. Derived from the resolved URI's port and scheme.
    pub tls: bool,
    pub proxy: Option<ProxyConfig>,
}

impl HttpRequest {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing every existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Attach HTTP basic credentials as an `Authorization` header.
    pub fn basic_auth(&mut self, username: &str, password: &str) {
        let token = STANDARD.encode(format!("{username}:{password}"));
        self.set_header("authorization", format!("Basic {token}"));
    }
}

/// Coarse response classification, decided once per response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirection,
    Error,
}

/// An HTTP response described as plain data.
///
/// Returned by a `Transport` after executing an `HttpRequest`.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn class(&self) -> StatusClass {
        match self.status {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirection,
            _ => StatusClass::Error,
        }
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(uri: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            uri: Url::parse(uri).unwrap(),
            headers: Vec::new(),
            body: None,
            tls: false,
            proxy: None,
        }
    }

    #[test]
    fn status_classes() {
        let class = |status| HttpResponse { status, ..Default::default() }.class();
        assert_eq!(class(200), StatusClass::Success);
        assert_eq!(class(204), StatusClass::Success);
        assert_eq!(class(301), StatusClass::Redirection);
        assert_eq!(class(302), StatusClass::Redirection);
        assert_eq!(class(404), StatusClass::Error);
        assert_eq!(class(500), StatusClass::Error);
        assert_eq!(class(101), StatusClass::Error);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let response = HttpResponse {
            status: 302,
            headers: vec![("Location".to_string(), "/foo".to_string())],
            body: Vec::new(),
        };
        assert_eq!(response.location(), Some("/foo"));
        assert_eq!(response.header("LOCATION"), Some("/foo"));
        assert!(response.content_type().is_none());
    }

    #[test]
    fn basic_auth_encodes_credentials() {
        let mut req = request("http://api.foo.com/v1");
        req.basic_auth("foobar", "secret");
        assert_eq!(req.header("Authorization"), Some("Basic Zm9vYmFyOnNlY3JldA=="));
    }

    #[test]
    fn set_header_replaces_existing_values() {
        let mut req = request("http://api.foo.com/v1");
        req.headers.push(("Authorization".to_string(), "one".to_string()));
        req.set_header("authorization", "two");
        assert_eq!(req.headers, vec![("authorization".to_string(), "two".to_string())]);
    }

    #[test]
    fn method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("BREW".parse::<HttpMethod>().is_err());
        assert!(HttpMethod::Delete.is_supported());
        assert!(!HttpMethod::Head.is_supported());
    }
}
