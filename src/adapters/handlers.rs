//! Built-in delegating handlers available to every route by name.
use std::{collections::HashMap, sync::Arc, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Request};
use tracing::Instrument;

use crate::{
    ports::{DelegatingHandler, Handler, HandlerResult, InnerHandler},
    tracing_setup::create_downstream_span,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wraps the rest of the chain in a `downstream_request` span and records
/// the response status and latency on it.
#[derive(Debug, Default)]
pub struct TracingHandler {
    inner: InnerHandler,
}

impl TracingHandler {
    pub const NAME: &'static str = "tracing";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Handler for TracingHandler {
    async fn send(&self, request: Request<Bytes>) -> HandlerResult {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let span = create_downstream_span(
            request.method().as_str(),
            &request.uri().to_string(),
            &request_id,
        );

        let start = Instant::now();
        let result = self
            .inner
            .send(Self::NAME, request)
            .instrument(span.clone())
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        span.record("duration_ms", duration_ms);
        match &result {
            Ok(response) => {
                span.record("http.status_code", response.status().as_u16());
                span.in_scope(|| {
                    tracing::debug!(
                        status = response.status().as_u16(),
                        duration_ms,
                        "Downstream request completed"
                    );
                });
            }
            Err(e) => span.in_scope(|| {
                tracing::debug!(duration_ms, "Downstream request failed: {}", e);
            }),
        }
        result
    }
}

impl DelegatingHandler for TracingHandler {
    fn set_inner(&mut self, inner: Arc<dyn Handler>) {
        self.inner.set(inner);
    }
}

/// Adds a fresh `X-Request-ID` to requests that do not carry one.
#[derive(Debug, Default)]
pub struct RequestIdHandler {
    inner: InnerHandler,
}

impl RequestIdHandler {
    pub const NAME: &'static str = "request_id";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Handler for RequestIdHandler {
    async fn send(&self, mut request: Request<Bytes>) -> HandlerResult {
        if !request.headers().contains_key(REQUEST_ID_HEADER) {
            let request_id = uuid::Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                request
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
        }
        self.inner.send(Self::NAME, request).await
    }
}

impl DelegatingHandler for RequestIdHandler {
    fn set_inner(&mut self, inner: Arc<dyn Handler>) {
        self.inner.set(inner);
    }
}

/// Adds a fixed set of headers to every request, never overriding a header
/// the request already carries.
#[derive(Debug, Clone, Default)]
pub struct HeaderInjectionHandler {
    headers: Arc<HeaderMap>,
    inner: InnerHandler,
}

impl HeaderInjectionHandler {
    pub const NAME: &'static str = "request_headers";

    pub fn new(headers: Arc<HeaderMap>) -> Self {
        Self {
            headers,
            inner: InnerHandler::default(),
        }
    }

    /// Convert configured name/value pairs, skipping (and logging) invalid ones.
    pub fn parse_headers(configured: &HashMap<String, String>) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(configured.len());
        for (name, value) in configured {
            match (
                name.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                (Ok(header_name), Ok(header_value)) => {
                    headers.insert(header_name, header_value);
                }
                _ => {
                    tracing::warn!("Skipping invalid request header: {}: {}", name, value);
                }
            }
        }
        headers
    }
}

#[async_trait]
impl Handler for HeaderInjectionHandler {
    async fn send(&self, mut request: Request<Bytes>) -> HandlerResult {
        let target = request.headers_mut();
        for (name, value) in self.headers.iter() {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
        self.inner.send(Self::NAME, request).await
    }
}

impl DelegatingHandler for HeaderInjectionHandler {
    fn set_inner(&mut self, inner: Arc<dyn Handler>) {
        self.inner.set(inner);
    }
}
