use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use http::Request;
use tokio_util::sync::CancellationToken;

use crate::ports::{ClientFactory, Handler, HandlerResult, SendError};

/// Timeout of a client nobody configured explicitly.
pub const UNCONFIGURED_CLIENT_TIMEOUT: Duration = Duration::from_secs(100);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`DownstreamClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A ready-to-use outbound client: a composed handler chain plus a timeout.
///
/// Not `Clone`: the pool hands each instance to a single caller at a time
/// and takes it back afterwards.
pub struct DownstreamClient {
    id: ClientId,
    name: String,
    primary: Arc<dyn Handler>,
    timeout: Duration,
}

impl DownstreamClient {
    pub fn new(name: impl Into<String>, primary: Arc<dyn Handler>) -> Self {
        Self {
            id: ClientId::next(),
            name: name.into(),
            primary,
            timeout: UNCONFIGURED_CLIENT_TIMEOUT,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send a request through the chain, bounded by the client timeout and
    /// the optional cancellation token.
    pub async fn send(
        &self,
        request: Request<Bytes>,
        cancellation: Option<&CancellationToken>,
    ) -> HandlerResult {
        let call = tokio::time::timeout(self.timeout, self.primary.send(request));

        let outcome = match cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(SendError::Cancelled("inbound request was aborted".to_string()));
                    }
                    outcome = call => outcome,
                }
            }
            None => call.await,
        };

        outcome.unwrap_or_else(|_| {
            Err(SendError::Cancelled(format!(
                "client '{}' timed out after {:?}",
                self.name, self.timeout
            )))
        })
    }
}

impl fmt::Debug for DownstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamClient")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builds plain named clients around the supplied primary handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClientFactory;

impl ClientFactory for DefaultClientFactory {
    fn create_client(&self, name: &str, primary: Arc<dyn Handler>) -> DownstreamClient {
        DownstreamClient::new(name, primary)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body as AxumBody;
    use http::{Response, StatusCode};

    use super::*;

    struct Delayed(Duration);

    #[async_trait]
    impl Handler for Delayed {
        async fn send(&self, _request: Request<Bytes>) -> HandlerResult {
            tokio::time::sleep(self.0).await;
            Ok(Response::new(AxumBody::empty()))
        }
    }

    fn request() -> Request<Bytes> {
        Request::new(Bytes::new())
    }

    #[test]
    fn test_client_ids_are_unique() {
        let a = DefaultClientFactory.create_client("a", Arc::new(Delayed(Duration::ZERO)));
        let b = DefaultClientFactory.create_client("a", Arc::new(Delayed(Duration::ZERO)));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "a");
        assert_eq!(a.timeout(), UNCONFIGURED_CLIENT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_send_within_timeout() {
        let mut client = DownstreamClient::new("fast", Arc::new(Delayed(Duration::ZERO)));
        client.set_timeout(Duration::from_secs(5));

        let response = client.send(request(), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_times_out_as_cancellation() {
        let mut client = DownstreamClient::new("slow", Arc::new(Delayed(Duration::from_secs(60))));
        client.set_timeout(Duration::from_millis(100));

        let err = client.send(request(), None).await.unwrap_err();
        assert!(matches!(err, SendError::Cancelled(ref msg) if msg.contains("slow")));
    }

    #[tokio::test]
    async fn test_send_observes_cancellation_token() {
        let client = DownstreamClient::new("slow", Arc::new(Delayed(Duration::from_secs(60))));
        let token = CancellationToken::new();
        token.cancel();

        let err = client.send(request(), Some(&token)).await.unwrap_err();
        assert!(matches!(err, SendError::Cancelled(_)));
    }
}
