//! Request descriptor: method, target and options, plus URI resolution.
//!
//! # Design
//! A descriptor is never mutated in place when a redirect arrives.
//! `redirected` returns a fresh descriptor with the new absolute target and
//! one less hop in the budget, and `resolve` recomputes the URI on every call,
//! so there is no cached URI to go stale.

use std::collections::BTreeMap;

use url::form_urlencoded;
use url::Url;

use crate::decode::Format;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::options::{Query, RequestOptions};

/// Where a request points before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Absolute(Url),
    /// Resolved against `RequestOptions::base_uri` by plain concatenation.
    Relative(String),
}

impl Target {
    pub fn parse(uri: &str) -> Result<Self> {
        match Url::parse(uri) {
            Ok(url) => Ok(Target::Absolute(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://relative.invalid/")
                    .and_then(|base| base.join(uri))
                    .map_err(|source| Error::InvalidUri {
                        uri: uri.to_string(),
                        source,
                    })?;
                Ok(Target::Relative(uri.to_string()))
            }
            Err(source) => Err(Error::InvalidUri {
                uri: uri.to_string(),
                source,
            }),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Target::Relative(_))
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: HttpMethod,
    target: Target,
    options: RequestOptions,
}

impl RequestDescriptor {
    /// Parse `target` and bundle it with the method and options. The method
    /// is checked later, by validation.
    pub fn new(method: HttpMethod, target: &str, options: RequestOptions) -> Result<Self> {
        Ok(Self {
            method,
            target: Target::parse(target)?,
            options,
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn format(&self) -> Option<&Format> {
        self.options.format.as_ref()
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.options.format = Some(format);
        self
    }

    /// The absolute URI to send to, query string included.
    pub fn resolve(&self) -> Result<Url> {
        let mut uri = match &self.target {
            Target::Absolute(url) => url.clone(),
            Target::Relative(path) => {
                let joined = format!("{}{path}", self.options.base_uri.as_deref().unwrap_or(""));
                Url::parse(&joined).map_err(|source| Error::InvalidUri {
                    uri: joined.clone(),
                    source,
                })?
            }
        };
        let query = self.query_string(&uri);
        uri.set_query(query.as_deref());
        Ok(uri)
    }

    /// Query mapping that travels as a form body instead of on the URI.
    pub fn form_query(&self) -> Option<&BTreeMap<String, String>> {
        match &self.options.query {
            Some(Query::Map(query)) if self.method == HttpMethod::Post => Some(query),
            _ => None,
        }
    }

    /// Descriptor for the next hop after a 3xx. `location` may be relative to
    /// the current resolved URI. Method, body, headers and auth carry over.
    pub fn redirected(&self, location: &str) -> Result<Self> {
        let next = self.resolve()?.join(location).map_err(|source| Error::InvalidUri {
            uri: location.to_string(),
            source,
        })?;
        let mut options = self.options.clone();
        options.redirect_limit -= 1;
        Ok(Self {
            method: self.method,
            target: Target::Absolute(next),
            options,
        })
    }

    fn query_string(&self, uri: &Url) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(existing) = uri.query().filter(|q| !q.is_empty()) {
            parts.push(existing.to_string());
        }

        let defaults = &self.options.default_params;
        match &self.options.query {
            Some(Query::Map(query)) if self.form_query().is_none() => {
                let mut merged = defaults.clone();
                merged.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));
                parts.push(encode_form(&merged));
            }
            query => {
                if !defaults.is_empty() {
                    parts.push(encode_form(defaults));
                }
                if let Some(Query::Raw(raw)) = query {
                    parts.push(raw.clone());
                }
            }
        }

        parts.retain(|part| !part.is_empty());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("&"))
        }
    }
}

/// `application/x-www-form-urlencoded` serialization of a mapping.
pub fn encode_form(params: &BTreeMap<String, String>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}
