//! Turns a validated descriptor into a transport-ready `HttpRequest`.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{Body, Query};
use crate::request::{encode_form, RequestDescriptor};
use crate::signing::{Signer, SigningContext};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reject descriptors that must never reach the network.
pub fn validate(descriptor: &RequestDescriptor) -> Result<()> {
    let options = descriptor.options();
    if options.redirect_limit <= 0 {
        return Err(Error::RedirectionTooDeep);
    }
    if !descriptor.method().is_supported() {
        return Err(Error::UnsupportedMethod(descriptor.method()));
    }
    if descriptor.method() == HttpMethod::Post && matches!(options.query, Some(Query::Raw(_))) {
        return Err(Error::InvalidOption(
            "query must be a mapping when using POST".to_string(),
        ));
    }
    Ok(())
}

/// Validate, resolve and assemble the request: body, headers, then basic
/// auth followed by signed auth, so a signed header replaces a basic one.
pub fn build(descriptor: &RequestDescriptor, signer: &dyn Signer) -> Result<HttpRequest> {
    validate(descriptor)?;

    let options = descriptor.options();
    let uri = descriptor.resolve()?;

    let (body, form) = match (&options.body, descriptor.form_query()) {
        (Some(body), _) if !body.is_empty() => match body {
            Body::Form(map) => (Some(encode_form(map).into_bytes()), Some(map)),
            Body::Text(text) => (Some(text.clone().into_bytes()), None),
            Body::Bytes(bytes) => (Some(bytes.clone()), None),
        },
        (_, Some(query)) => (Some(encode_form(query).into_bytes()), Some(query)),
        _ => (None, None),
    };

    let mut headers = options.headers.clone();
    if form.is_some() && !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
        headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
    }

    let mut request = HttpRequest {
        method: descriptor.method(),
        tls: uses_tls(&uri),
        uri,
        headers,
        body,
        proxy: options.proxy.clone(),
    };

    if let Some(auth) = &options.basic_auth {
        request.basic_auth(&auth.username, &auth.password);
    }

    if let Some(auth) = &options.signed_auth {
        let form_params = form.map(pairs).unwrap_or_default();
        let ctx = SigningContext {
            method: request.method,
            uri: &request.uri,
            consumer_key: &auth.key,
            consumer_secret: &auth.secret,
            signature_method: auth.method.unwrap_or_default(),
            form_params: &form_params,
        };
        let header = signer.sign(&ctx)?;
        request.set_header("authorization", header);
    }

    Ok(request)
}

/// TLS is used for port 443 and for `https` URIs.
pub fn uses_tls(uri: &Url) -> bool {
    uri.port_or_known_default() == Some(443) || uri.scheme() == "https"
}

fn pairs(map: &BTreeMap<String, String>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RequestOptions;
    use crate::signing::{OAuth1Signer, SignatureMethod};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Signer returning a fixed header and recording nothing.
    struct StaticSigner;

    impl Signer for StaticSigner {
        fn sign(&self, ctx: &SigningContext<'_>) -> Result<String> {
            Ok(format!(
                "Signed {} {} {}",
                ctx.consumer_key,
                ctx.uri,
                ctx.form_params.len()
            ))
        }
    }

    fn descriptor(method: HttpMethod, target: &str, options: RequestOptions) -> RequestDescriptor {
        RequestDescriptor::new(method, target, options).unwrap()
    }

    fn body_text(req: &HttpRequest) -> &str {
        std::str::from_utf8(req.body.as_deref().unwrap()).unwrap()
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn zero_or_negative_budget_is_rejected(#[case] limit: i64) {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().redirect_limit(limit),
        );
        assert!(matches!(validate(&req), Err(Error::RedirectionTooDeep)));
    }

    #[test]
    fn no_follow_is_rejected_before_building() {
        let req = descriptor(HttpMethod::Get, "http://api.foo.com/v1", RequestOptions::new().no_follow());
        assert!(matches!(build(&req, &OAuth1Signer), Err(Error::RedirectionTooDeep)));
    }

    #[rstest]
    #[case(HttpMethod::Head)]
    #[case(HttpMethod::Patch)]
    #[case(HttpMethod::Options)]
    fn unsupported_methods_are_rejected(#[case] method: HttpMethod) {
        let req = descriptor(method, "http://api.foo.com/v1", RequestOptions::new());
        assert!(matches!(validate(&req), Err(Error::UnsupportedMethod(m)) if m == method));
    }

    #[test]
    fn post_with_string_query_is_rejected() {
        let req = descriptor(
            HttpMethod::Post,
            "http://api.foo.com/v1",
            RequestOptions::new().raw_query("astring"),
        );
        assert!(matches!(validate(&req), Err(Error::InvalidOption(_))));
    }

    #[test]
    fn get_with_string_query_is_allowed() {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().raw_query("astring"),
        );
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn budget_is_checked_before_method() {
        let req = descriptor(HttpMethod::Head, "http://api.foo.com/v1", RequestOptions::new().no_follow());
        assert!(matches!(validate(&req), Err(Error::RedirectionTooDeep)));
    }

    #[test]
    fn form_body_is_url_encoded() {
        let req = descriptor(
            HttpMethod::Put,
            "http://api.foo.com/v1",
            RequestOptions::new().form([("name", "Foo Bar"), ("id", "1")]),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        assert_eq!(body_text(&built), "id=1&name=Foo+Bar");
        assert_eq!(built.header("content-type"), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn raw_body_is_sent_verbatim() {
        let req = descriptor(
            HttpMethod::Post,
            "http://api.foo.com/v1",
            RequestOptions::new().body("<xml/>").header("Content-Type", "text/xml"),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        assert_eq!(body_text(&built), "<xml/>");
        assert_eq!(built.headers, vec![("Content-Type".to_string(), "text/xml".to_string())]);
    }

    #[test]
    fn empty_body_is_omitted() {
        let req = descriptor(HttpMethod::Post, "http://api.foo.com/v1", RequestOptions::new().body(""));
        assert!(build(&req, &OAuth1Signer).unwrap().body.is_none());
    }

    #[test]
    fn post_query_mapping_becomes_the_body() {
        let req = descriptor(
            HttpMethod::Post,
            "http://api.foo.com/v1",
            RequestOptions::new().query([("name", "foo")]),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        assert_eq!(body_text(&built), "name=foo");
        assert_eq!(built.uri.query(), None);
    }

    #[test]
    fn explicit_body_wins_over_post_query() {
        let req = descriptor(
            HttpMethod::Post,
            "http://api.foo.com/v1",
            RequestOptions::new().query([("name", "foo")]).body("raw"),
        );
        assert_eq!(body_text(&build(&req, &OAuth1Signer).unwrap()), "raw");
    }

    #[test]
    fn headers_are_copied_in_order() {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().header("Accept", "text/xml").header("X-Trace", "1"),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        assert_eq!(
            built.headers,
            vec![
                ("Accept".to_string(), "text/xml".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn basic_auth_sets_authorization() {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().basic_auth("foobar", "secret"),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        assert_eq!(built.header("authorization"), Some("Basic Zm9vYmFyOnNlY3JldA=="));
    }

    #[test]
    fn signed_auth_fills_authorization() {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().signed_auth("oauth_key", "oauth_secret", Some(SignatureMethod::HmacSha1)),
        );
        let built = build(&req, &OAuth1Signer).unwrap();
        let header = built.header("authorization").unwrap();
        assert!(header.contains(r#"oauth_consumer_key="oauth_key""#));
        assert!(header.contains(r#"oauth_signature_method="HMAC-SHA1""#));
        assert!(header.contains("oauth_signature="));
    }

    #[test]
    fn signed_auth_overrides_basic_auth() {
        let req = descriptor(
            HttpMethod::Post,
            "http://api.foo.com/v1?x=1",
            RequestOptions::new()
                .basic_auth("foobar", "secret")
                .signed_auth("key", "secret", None)
                .query([("a", "1"), ("b", "2")]),
        );
        let built = build(&req, &StaticSigner).unwrap();
        let auth: Vec<_> = built
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].1, "Signed key http://api.foo.com/v1?x=1 2");
    }

    #[rstest]
    #[case("https://api.foo.com/v1", true)]
    #[case("http://api.foo.com:443/v1", true)]
    #[case("http://foobar.com", false)]
    #[case("http://foobar.com:8080", false)]
    fn tls_follows_port_and_scheme(#[case] uri: &str, #[case] tls: bool) {
        let req = descriptor(HttpMethod::Get, uri, RequestOptions::new());
        assert_eq!(build(&req, &OAuth1Signer).unwrap().tls, tls);
    }

    #[test]
    fn proxy_is_passed_through() {
        let req = descriptor(
            HttpMethod::Get,
            "http://api.foo.com/v1",
            RequestOptions::new().proxy("proxy.local", 3128),
        );
        let proxy = build(&req, &OAuth1Signer).unwrap().proxy.unwrap();
        assert_eq!((proxy.host.as_str(), proxy.port), ("proxy.local", 3128));
    }
}
