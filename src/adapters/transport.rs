use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{Request, Response, header};
use reqwest::redirect::Policy;

use crate::ports::{
    BoxError, Handler, HandlerResult, MAX_REDIRECTS, SendError, TransportFactory,
    TransportOptions,
};

/// Base transport handler on top of `reqwest` (rustls).
///
/// Responsibilities:
/// * Owns a per-client cookie store when the route asks for one
/// * Follows redirects only when the route allows it
/// * Skips certificate validation when the route opts into it
/// * Reads the whole downstream body before answering, so the client
///   timeout covers the body as well as the headers
pub struct TransportHandler {
    client: reqwest::Client,
    options: TransportOptions,
}

impl TransportHandler {
    pub fn new(options: TransportOptions) -> Result<Self, reqwest::Error> {
        let redirect = if options.allow_auto_redirect {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        // Downstream calls always go direct, ignoring proxy environment variables
        let client = reqwest::Client::builder()
            .no_proxy()
            .redirect(redirect)
            .cookie_store(options.use_cookie_container)
            .danger_accept_invalid_certs(options.accept_any_server_certificate)
            .build()?;

        tracing::debug!(
            cookies = options.use_cookie_container,
            redirects = options.allow_auto_redirect,
            accept_any_certificate = options.accept_any_server_certificate,
            "Created downstream transport"
        );
        Ok(Self { client, options })
    }

    pub fn options(&self) -> TransportOptions {
        self.options
    }
}

#[async_trait]
impl Handler for TransportHandler {
    async fn send(&self, request: Request<Bytes>) -> HandlerResult {
        let (parts, body) = request.into_parts();
        let url = reqwest::Url::parse(&parts.uri.to_string())
            .map_err(|e| SendError::InvalidRequest(format!("'{}': {e}", parts.uri)))?;

        tracing::debug!("Sending downstream request: {} {}", parts.method, url);

        let response = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let version = response.version();
        let mut headers = response.headers().clone();
        // The body is re-framed by whoever serves it next
        headers.remove(header::TRANSFER_ENCODING);
        let body = response.bytes().await?;

        let mut out = Response::new(AxumBody::from(body));
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Creates a fresh [`TransportHandler`] for every cold client build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransportFactory;

impl TransportFactory for ReqwestTransportFactory {
    fn create_transport(&self, options: &TransportOptions) -> Result<Arc<dyn Handler>, BoxError> {
        Ok(Arc::new(TransportHandler::new(*options)?))
    }
}
