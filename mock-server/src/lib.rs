use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

pub const BOOKS_XML: &str = "<books><book><id>1234</id><name>Foo Bar!</name></book></books>";
pub const BOOKS_JSON: &str = r#"{"books":{"book":{"name":"Foo Bar!","id":"1234"}}}"#;

/// Shared server state. `loop_hits` counts requests to `/loop`.
#[derive(Clone, Default)]
pub struct AppState {
    pub loop_hits: Arc<AtomicUsize>,
}

impl AppState {
    pub fn loop_hits(&self) -> usize {
        self.loop_hits.load(Ordering::SeqCst)
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/books.xml", any(books_xml))
        .route("/books.json", any(books_json))
        .route("/text", get(text))
        .route("/empty", get(empty))
        .route("/bytes/{len}", get(bytes))
        .route("/echo", any(echo))
        .route("/redirect", any(redirect))
        .route("/redirect/{hops}", any(redirect_chain))
        .route("/loop", any(redirect_loop))
        .route("/no-location", any(no_location))
        .route("/status/{code}", any(status))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn books_xml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], BOOKS_XML)
}

async fn books_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], BOOKS_JSON)
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "just text")
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `len` bytes of `a` as plain text.
async fn bytes(Path(len): Path<usize>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], vec![b'a'; len])
}

/// Reflect the request back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let get_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "query": uri.query(),
        "authorization": get_header(header::AUTHORIZATION),
        "content_type": get_header(header::CONTENT_TYPE),
        "body": body,
    }))
}

async fn redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/books.xml")]).into_response()
}

async fn redirect_chain(Path(hops): Path<u32>) -> Response {
    let location = match hops {
        0 | 1 => "/echo".to_string(),
        n => format!("/redirect/{}", n - 1),
    };
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn redirect_loop(State(state): State<AppState>) -> Response {
    let hits = state.loop_hits.fetch_add(1, Ordering::SeqCst) + 1;
    info!(hits, "redirect loop");
    (StatusCode::FOUND, [(header::LOCATION, "/loop")]).into_response()
}

async fn no_location() -> StatusCode {
    StatusCode::FOUND
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({ "error": status.canonical_reason().unwrap_or("unknown"), "code": code });
    (status, Json(body)).into_response()
}
