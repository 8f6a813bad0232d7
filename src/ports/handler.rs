use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;

/// Boxed error used for causes raised by custom handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure signals raised while a request travels through a handler chain.
///
/// Handlers (policy layers included) report their failures through these
/// variants; the requester later reduces them to an [`ErrorKind`].
///
/// [`ErrorKind`]: crate::ports::requester::ErrorKind
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SendError {
    /// A timeout policy in the chain refused to wait any longer
    #[error("Timeout policy rejected the call after {0:?}")]
    TimeoutRejected(Duration),

    /// The in-flight call was cancelled (client timeout or aborted inbound request)
    #[error("Request was cancelled: {0}")]
    Cancelled(String),

    /// A circuit breaker in the chain is open and refused to attempt the call
    #[error("Circuit is open: {0}")]
    CircuitOpen(String),

    /// The transport failed (DNS, connect, TLS, protocol ...)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The outbound request could not be formed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other failure raised by a custom handler
    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    /// A delegating handler was invoked before its inner link was assigned
    #[error("Delegating handler '{0}' has no inner handler")]
    MissingInnerHandler(&'static str),
}

/// Result of sending a request through a handler.
pub type HandlerResult = Result<Response<AxumBody>, SendError>;

/// A link in the outbound handler chain: takes a request, produces a response.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Send the request (possibly forwarding it to the next link).
    async fn send(&self, request: Request<Bytes>) -> HandlerResult;
}

/// A handler that wraps another one. The chain builder assigns the inner
/// link once, right after construction and before the first request.
pub trait DelegatingHandler: Handler {
    /// Set the next link in the chain.
    fn set_inner(&mut self, inner: Arc<dyn Handler>);
}

#[async_trait]
impl Handler for Box<dyn DelegatingHandler> {
    async fn send(&self, request: Request<Bytes>) -> HandlerResult {
        (**self).send(request).await
    }
}

/// Storage for the inner link of a [`DelegatingHandler`].
#[derive(Clone, Default)]
pub struct InnerHandler(Option<Arc<dyn Handler>>);

impl InnerHandler {
    pub fn set(&mut self, inner: Arc<dyn Handler>) {
        self.0 = Some(inner);
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Forward to the inner link; `owner` names the calling handler in the
    /// error raised when the link is missing.
    pub async fn send(&self, owner: &'static str, request: Request<Bytes>) -> HandlerResult {
        match &self.0 {
            Some(inner) => inner.send(request).await,
            None => Err(SendError::MissingInnerHandler(owner)),
        }
    }
}

impl std::fmt::Debug for InnerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InnerHandler").field(&self.is_set()).finish()
    }
}
