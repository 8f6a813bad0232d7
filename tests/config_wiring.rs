// Requester assembled from a configuration file with built-in handlers
mod common;

use std::{io::Write, sync::Arc};

use common::{body_string, context, spawn_backend};
use downstream_requester::{
    HandlerRegistry, HttpRequester, MemoryClientPool, PoolKey, Requester, ReqwestTransportFactory,
    config::{ConfigValidator, DownstreamRoute, load_config},
};
use http::{HeaderValue, Method};
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
default_timeout: "5s"
default_client_name: "gateway"
pool:
  expiry: "10m"
global_handlers:
  - request_id
  - tracing
request_headers:
  X-Gateway: "edge-1"
routes:
  orders:
    upstream_path_template: "/orders/{everything}"
    downstream_path_template: "/header/{everything}"
    delegating_handlers:
      - request_headers
"#;

async fn requester_from_file() -> (HttpRequester, Arc<MemoryClientPool>, Arc<DownstreamRoute>) {
    let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
    write!(file, "{CONFIG}").unwrap();

    let config = load_config(file.path().to_str().unwrap()).await.unwrap();
    let registry = HandlerRegistry::from_config(&config);
    ConfigValidator::validate(&config, &registry.names()).unwrap();

    let pool = Arc::new(MemoryClientPool::new());
    let requester = HttpRequester::new(
        pool.clone(),
        Arc::new(ReqwestTransportFactory),
        Arc::new(registry),
        config.settings().unwrap(),
    );
    (requester, pool, Arc::new(config.routes["orders"].clone()))
}

#[tokio::test]
async fn test_builtin_handlers_from_config() {
    let addr = spawn_backend().await;
    let (requester, _pool, route) = requester_from_file().await;

    let response = requester
        .get_response(&context(
            &route,
            Method::GET,
            format!("http://{addr}/header/x-gateway"),
        ))
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "edge-1");

    let response = requester
        .get_response(&context(
            &route,
            Method::GET,
            format!("http://{addr}/header/x-request-id"),
        ))
        .await
        .unwrap();
    let request_id = body_string(response).await;
    assert!(uuid::Uuid::parse_str(&request_id).is_ok(), "got {request_id}");
}

#[tokio::test]
async fn test_caller_headers_win_over_configured_ones() {
    let addr = spawn_backend().await;
    let (requester, pool, route) = requester_from_file().await;

    let url = format!("http://{addr}/header/x-gateway");
    let mut ctx = context(&route, Method::GET, url.clone());
    ctx.request = ctx
        .request
        .with_header("x-gateway".parse().unwrap(), HeaderValue::from_static("inner-7"));

    let response = requester.get_response(&ctx).await.unwrap();
    assert_eq!(body_string(response).await, "inner-7");
    assert_eq!(pool.idle_count(&PoolKey::new(&Method::GET, &url)).await, 1);
}

#[tokio::test]
async fn test_settings_come_from_config() {
    let (requester, _pool, _route) = requester_from_file().await;
    let settings = requester.settings();

    assert_eq!(settings.default_client_name, "gateway");
    assert_eq!(settings.default_timeout, std::time::Duration::from_secs(5));
    assert_eq!(settings.pool_expiry, std::time::Duration::from_secs(600));
}
