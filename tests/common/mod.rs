//! Shared helpers for integration tests: a local axum downstream and
//! requester wiring.
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use downstream_requester::{
    DownstreamContext, DownstreamRequest, HandlerChainSource, HttpRequester, MemoryClientPool,
    RequesterSettings, ReqwestTransportFactory, config::DownstreamRoute,
};
use bytes::Bytes;
use http::Method;

/// Start the mock downstream on an ephemeral port.
///
/// * `/echo` answers 200 "ok"
/// * `/chain` answers with the `x-chain` request header
/// * `/header/{name}` answers with the value of that request header
/// * `/cookie` sets `session=1` unless the request already carries it
/// * `/redirect` answers 302 towards `/echo`
/// * `/slow` answers after two seconds
/// * `/trickle` sends its headers and a first chunk, then stalls for ten seconds
pub async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/echo", any(|| async { "ok" }))
        .route("/chain", get(chain))
        .route("/header/{name}", get(header_value))
        .route("/cookie", get(cookie))
        .route("/redirect", get(redirect))
        .route("/trickle", get(trickle))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn chain(headers: HeaderMap) -> String {
    headers
        .get("x-chain")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn header_value(Path(name): Path<String>, headers: HeaderMap) -> String {
    headers
        .get(name.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn cookie(headers: HeaderMap) -> Response {
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("session=1"));

    if has_session {
        "has-cookie".into_response()
    } else {
        Response::builder()
            .header(header::SET_COOKIE, "session=1; Path=/")
            .body(Body::from("no-cookie"))
            .unwrap()
    }
}

async fn redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/echo")]).into_response()
}

async fn trickle() -> Response {
    let chunks = futures_util::stream::unfold(0u8, |step| async move {
        match step {
            0 => Some((Ok::<_, std::io::Error>(Bytes::from_static(b"head")), 1)),
            1 => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Some((Ok(Bytes::from_static(b"tail")), 2))
            }
            _ => None,
        }
    });
    Response::new(Body::from_stream(chunks))
}

/// A port nothing listens on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn route(upstream: &str) -> DownstreamRoute {
    DownstreamRoute {
        upstream_path_template: upstream.to_string(),
        downstream_path_template: upstream.to_string(),
        ..Default::default()
    }
}

pub fn requester(
    pool: Arc<MemoryClientPool>,
    chains: Arc<dyn HandlerChainSource>,
) -> HttpRequester {
    HttpRequester::new(
        pool,
        Arc::new(ReqwestTransportFactory),
        chains,
        RequesterSettings::default(),
    )
}

pub fn context(route: &DownstreamRoute, method: Method, url: String) -> DownstreamContext {
    DownstreamContext::new(Arc::new(route.clone()), DownstreamRequest::new(method, url))
}

pub async fn body_string(response: http::Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
