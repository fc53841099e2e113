//! The options bag carried by every request.
//!
//! # Design
//! `RequestOptions` is a plain struct with builder-style setters, so typed
//! callers cannot produce a malformed `headers` or `basic_auth`. Callers that
//! hold options as loosely typed JSON go through `RequestOptions::from_json`,
//! which reports shape errors as `Error::InvalidOption` before anything is
//! built or sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::Format;
use crate::error::Error;
use crate::signing::SignatureMethod;

/// Redirect budget used unless the caller opts out with `no_follow`.
pub const DEFAULT_REDIRECT_LIMIT: i64 = 5;

/// Query parameters: either a mapping merged with the default params or a
/// pre-encoded string appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Map(BTreeMap<String, String>),
    Raw(String),
}

/// Request body. `Form` is URL-encoded, the others are sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Form(BTreeMap<String, String>),
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Form(map) => map.is_empty(),
            Body::Text(text) => text.is_empty(),
            Body::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Consumer credentials for an OAuth-style signed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuth {
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub method: Option<SignatureMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub base_uri: Option<String>,
    pub query: Option<Query>,
    pub default_params: BTreeMap<String, String>,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    pub signed_auth: Option<SignedAuth>,
    pub format: Option<Format>,
    pub redirect_limit: i64,
    pub proxy: Option<ProxyConfig>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            base_uri: None,
            query: None,
            default_params: BTreeMap::new(),
            body: None,
            headers: Vec::new(),
            basic_auth: None,
            signed_auth: None,
            format: None,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            proxy: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not follow redirects. The zero budget fails validation, so the
    /// request is rejected with `RedirectionTooDeep` before it is sent.
    pub fn no_follow(mut self) -> Self {
        self.redirect_limit = 0;
        self
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = Some(Query::Map(collect_map(params)));
        self
    }

    pub fn raw_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(Query::Raw(query.into()));
        self
    }

    pub fn default_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.default_params = collect_map(params);
        self
    }

    pub fn form<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(Body::Form(collect_map(params)));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(body.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn signed_auth(
        mut self,
        key: impl Into<String>,
        secret: impl Into<String>,
        method: Option<SignatureMethod>,
    ) -> Self {
        self.signed_auth = Some(SignedAuth {
            key: key.into(),
            secret: secret.into(),
            method,
        });
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn redirect_limit(mut self, limit: i64) -> Self {
        self.redirect_limit = limit;
        self
    }

    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyConfig {
            host: host.into(),
            port,
        });
        self
    }

    /// Load options from a JSON object.
    ///
    /// Recognised keys: `base_uri`, `query`, `default_params`, `body`,
    /// `headers`, `basic_auth`, `signed_auth`, `format`, `redirect_limit`,
    /// `no_follow`, `proxy`. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidOption("options must be a mapping".to_string()))?;

        let mut options = RequestOptions::default();

        if let Some(v) = present(obj.get("base_uri")) {
            options.base_uri = Some(expect_str(v, "base_uri")?.to_string());
        }
        if let Some(v) = present(obj.get("query")) {
            options.query = Some(match v {
                Value::Object(_) => Query::Map(string_map(v, "query")?),
                Value::String(s) => Query::Raw(s.clone()),
                _ => {
                    return Err(Error::InvalidOption(
                        "query must be a mapping or a string".to_string(),
                    ))
                }
            });
        }
        if let Some(v) = present(obj.get("default_params")) {
            options.default_params = string_map(v, "default_params")?;
        }
        if let Some(v) = present(obj.get("body")) {
            options.body = Some(match v {
                Value::Object(_) => Body::Form(string_map(v, "body")?),
                Value::String(s) => Body::Text(s.clone()),
                _ => {
                    return Err(Error::InvalidOption(
                        "body must be a mapping or a string".to_string(),
                    ))
                }
            });
        }
        if let Some(v) = present(obj.get("headers")) {
            options.headers = string_map(v, "headers")?.into_iter().collect();
        }
        if let Some(v) = present(obj.get("basic_auth")) {
            options.basic_auth = Some(typed(v, "basic_auth")?);
        }
        if let Some(v) = present(obj.get("signed_auth")) {
            options.signed_auth = Some(typed(v, "signed_auth")?);
        }
        if let Some(v) = present(obj.get("format")) {
            options.format = Some(expect_str(v, "format")?.parse()?);
        }
        if let Some(v) = present(obj.get("redirect_limit")) {
            options.redirect_limit = v.as_i64().ok_or_else(|| {
                Error::InvalidOption("redirect_limit must be an integer".to_string())
            })?;
        }
        if let Some(v) = present(obj.get("proxy")) {
            options.proxy = Some(typed(v, "proxy")?);
        }
        if obj.get("no_follow").and_then(Value::as_bool).unwrap_or(false) {
            options.redirect_limit = 0;
        }

        Ok(options)
    }
}

fn collect_map<K, V>(params: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, String>
where
    K: Into<String>,
    V: Into<String>,
{
    params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn expect_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, Error> {
    value
        .as_str()
        .ok_or_else(|| Error::InvalidOption(format!("{key} must be a string")))
}

/// Mapping with scalar values; numbers and booleans are stringified.
fn string_map(value: &Value, key: &str) -> Result<BTreeMap<String, String>, Error> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::InvalidOption(format!("{key} must be a mapping")))?;
    obj.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(Error::InvalidOption(format!(
                        "{key}.{k} must be a scalar value"
                    )))
                }
            };
            Ok((k.clone(), v))
        })
        .collect()
}

fn typed<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Result<T, Error> {
    if !value.is_object() {
        return Err(Error::InvalidOption(format!("{key} must be a mapping")));
    }
    serde_json::from_value(value.clone()).map_err(|e| Error::InvalidOption(format!("{key}: {e}")))
}
