//! OAuth-style request signing.
//!
//! # Design
//! The builder hands a `SigningContext` to a `Signer` and stores whatever
//! header value comes back in `Authorization`. `OAuth1Signer` implements the
//! OAuth 1.0 header scheme for two-legged (consumer only, no token) requests.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureMethod {
    #[default]
    #[serde(rename = "HMAC-SHA1")]
    HmacSha1,
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
    #[serde(rename = "PLAINTEXT")]
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::HmacSha256 => "HMAC-SHA256",
            SignatureMethod::Plaintext => "PLAINTEXT",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "HMAC-SHA256" => Ok(SignatureMethod::HmacSha256),
            "PLAINTEXT" => Ok(SignatureMethod::Plaintext),
            other => Err(Error::InvalidOption(format!(
                "unsupported signature method `{other}`"
            ))),
        }
    }
}

/// Everything a signer may look at.
#[derive(Debug, Clone)]
pub struct SigningContext<'a> {
    pub method: HttpMethod,
    /// The fully resolved request URI, query included.
    pub uri: &'a Url,
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub signature_method: SignatureMethod,
    /// Form-encoded body parameters, which take part in the signature.
    pub form_params: &'a [(String, String)],
}

/// Produces an `Authorization` header value for a request.
pub trait Signer: Send + Sync {
    fn sign(&self, ctx: &SigningContext<'_>) -> Result<String, Error>;
}

/// OAuth 1.0 `Authorization: OAuth ...` header signer without a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuth1Signer;

impl Signer for OAuth1Signer {
    fn sign(&self, ctx: &SigningContext<'_>) -> Result<String, Error> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Signing(e.to_string()))?
            .as_secs();
        let nonce = Uuid::new_v4().simple().to_string();
        self.sign_with(ctx, &nonce, timestamp)
    }
}

impl OAuth1Signer {
    /// Sign with a caller-chosen nonce and timestamp.
    pub fn sign_with(
        &self,
        ctx: &SigningContext<'_>,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, Error> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), ctx.consumer_key.to_string()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                ctx.signature_method.as_str().to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let key = format!("{}&", percent_encode(ctx.consumer_secret));
        let signature = match ctx.signature_method {
            SignatureMethod::Plaintext => key,
            SignatureMethod::HmacSha1 => {
                let base = signature_base_string(ctx, &oauth_params);
                let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                    .map_err(|e| Error::Signing(e.to_string()))?;
                mac.update(base.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            }
            SignatureMethod::HmacSha256 => {
                let base = signature_base_string(ctx, &oauth_params);
                let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                    .map_err(|e| Error::Signing(e.to_string()))?;
                mac.update(base.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            }
        };
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

/// `METHOD&base-uri&normalized-params`, each part percent-encoded.
pub fn signature_base_string(ctx: &SigningContext<'_>, oauth_params: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = ctx
        .uri
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .chain(ctx.form_params.iter().cloned())
        .chain(oauth_params.iter().cloned())
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    params.sort();

    let normalized: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();

    format!(
        "{}&{}&{}",
        ctx.method.as_str(),
        percent_encode(&base_uri(ctx.uri)),
        percent_encode(&normalized.join("&"))
    )
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_uri(uri: &Url) -> String {
    let host = uri.host_str().unwrap_or_default().to_ascii_lowercase();
    match uri.port() {
        Some(port) => format!("{}://{host}:{port}{}", uri.scheme(), uri.path()),
        None => format!("{}://{host}{}", uri.scheme(), uri.path()),
    }
}

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const OAUTH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH).to_string()
}
