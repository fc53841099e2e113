use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, AppState, BOOKS_JSON, BOOKS_XML};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: http::header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// --- formats ---

#[tokio::test]
async fn books_xml_has_xml_content_type() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/books.xml"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header(&resp, http::header::CONTENT_TYPE).contains("application/xml"));
    assert_eq!(body_bytes(resp).await, BOOKS_XML.as_bytes());
}

#[tokio::test]
async fn books_json_has_json_content_type() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/books.json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, http::header::CONTENT_TYPE), "application/json");
    assert_eq!(body_bytes(resp).await, BOOKS_JSON.as_bytes());
}

#[tokio::test]
async fn empty_returns_204_without_body() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/empty"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn bytes_returns_requested_length() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/bytes/1024"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, http::header::CONTENT_TYPE), "text/plain");
    let body = body_bytes(resp).await;
    assert_eq!(body.len(), 1024);
    assert!(body.iter().all(|&b| b == b'a'));
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_query_and_body() {
    let req = Request::builder()
        .method("PUT")
        .uri("/echo?a=1")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .header(http::header::AUTHORIZATION, "Basic abc")
        .body("payload".to_string())
        .unwrap();
    let resp = app(AppState::default()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed = body_json(resp).await;
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["query"], "a=1");
    assert_eq!(echoed["authorization"], "Basic abc");
    assert_eq!(echoed["content_type"], "text/plain");
    assert_eq!(echoed["body"], "payload");
}

// --- redirects ---

#[tokio::test]
async fn redirect_points_at_books_xml() {
    let resp = app(AppState::default())
        .oneshot(request("POST", "/redirect"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(header(&resp, http::header::LOCATION), "/books.xml");
}

#[tokio::test]
async fn redirect_chain_counts_down_to_echo() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/redirect/3"))
        .await
        .unwrap();
    assert_eq!(header(&resp, http::header::LOCATION), "/redirect/2");

    let resp = app(AppState::default())
        .oneshot(request("GET", "/redirect/1"))
        .await
        .unwrap();
    assert_eq!(header(&resp, http::header::LOCATION), "/echo");
}

#[tokio::test]
async fn redirect_loop_counts_hits() {
    let state = AppState::default();
    for _ in 0..3 {
        let resp = app(state.clone())
            .oneshot(request("GET", "/loop"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(header(&resp, http::header::LOCATION), "/loop");
    }
    assert_eq!(state.loop_hits(), 3);
}

#[tokio::test]
async fn no_location_omits_the_header() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/no-location"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp.headers().get(http::header::LOCATION).is_none());
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code_with_json_body() {
    let resp = app(AppState::default())
        .oneshot(request("DELETE", "/status/404"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn status_rejects_non_numeric_codes() {
    let resp = app(AppState::default())
        .oneshot(request("GET", "/status/teapot"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
