//! Per-request inputs of the downstream call: the route policy, the outbound
//! request and the key under which clients for it are pooled.
use std::{fmt, sync::Arc};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use tokio_util::sync::CancellationToken;

use crate::{config::DownstreamRoute, ports::SendError};

/// Key identifying which idle clients a request may reuse.
///
/// Derived from the method and the original URL string only; route flags
/// (certificate bypass, cookies, redirects, timeout) do not take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(String);

impl PoolKey {
    pub fn new(method: &Method, original_url: &str) -> Self {
        Self(format!("{method}:{original_url}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The outbound request as prepared by the routing layer.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
}

impl DownstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL exactly as the routing layer produced it.
    pub fn original_url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Build the message sent through the handler chain.
    pub fn to_http_request(&self) -> Result<Request<Bytes>, SendError> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| SendError::InvalidRequest(format!("'{}': {e}", self.url)))?;

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(url.as_str())
            .body(self.body.clone())
            .map_err(|e| SendError::InvalidRequest(e.to_string()))?;
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }
}

/// Everything the requester needs for one downstream call.
#[derive(Debug, Clone)]
pub struct DownstreamContext {
    pub route: Arc<DownstreamRoute>,
    pub request: DownstreamRequest,
    /// Fires when the inbound request is aborted
    pub cancellation: Option<CancellationToken>,
}

impl DownstreamContext {
    pub fn new(route: Arc<DownstreamRoute>, request: DownstreamRequest) -> Self {
        Self {
            route,
            request,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(self.request.method(), self.request.original_url())
    }
}
