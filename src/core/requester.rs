//! Downstream call orchestration.
//!
//! `HttpRequester` runs the linear create → send → classify → save sequence
//! for every request and reduces each failure to a [`RequesterError`]; no
//! failure of the send step escapes as anything but a value.
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    core::{
        builder::{ClientBuilder, RequesterSettings},
        client::DefaultClientFactory,
        context::DownstreamContext,
    },
    ports::{
        ClientFactory, ClientPool, DownstreamResult, ErrorKind, HandlerChainSource, Requester,
        RequesterError, SendError, TransportFactory,
    },
};

/// Map a send failure to the kind reported to the gateway pipeline.
pub fn classify(error: &SendError) -> ErrorKind {
    match error {
        SendError::TimeoutRejected(_) | SendError::Cancelled(_) | SendError::CircuitOpen(_) => {
            ErrorKind::RequestTimedOut
        }
        _ => ErrorKind::UnableToCompleteRequest,
    }
}

fn into_requester_error(error: SendError) -> RequesterError {
    match classify(&error) {
        ErrorKind::RequestTimedOut => RequesterError::RequestTimedOut(error),
        _ => RequesterError::UnableToCompleteRequest(error),
    }
}

/// Executes downstream calls over pooled, per-route configured clients.
#[derive(Clone)]
pub struct HttpRequester {
    pool: Arc<dyn ClientPool>,
    transports: Arc<dyn TransportFactory>,
    chains: Arc<dyn HandlerChainSource>,
    clients: Arc<dyn ClientFactory>,
    settings: Arc<RequesterSettings>,
}

impl HttpRequester {
    pub fn new(
        pool: Arc<dyn ClientPool>,
        transports: Arc<dyn TransportFactory>,
        chains: Arc<dyn HandlerChainSource>,
        settings: RequesterSettings,
    ) -> Self {
        Self {
            pool,
            transports,
            chains,
            clients: Arc::new(DefaultClientFactory),
            settings: Arc::new(settings),
        }
    }

    /// Replace the named-client facility used on cold builds.
    pub fn with_client_factory(mut self, clients: Arc<dyn ClientFactory>) -> Self {
        self.clients = clients;
        self
    }

    pub fn settings(&self) -> &RequesterSettings {
        &self.settings
    }

    fn client_builder(&self) -> ClientBuilder {
        ClientBuilder::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.transports),
            Arc::clone(&self.chains),
            Arc::clone(&self.settings),
        )
        .with_client_factory(Arc::clone(&self.clients))
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn get_response(&self, context: &DownstreamContext) -> DownstreamResult {
        let builder = self.client_builder();

        let lease = match builder.create(context).await {
            Ok(lease) => lease,
            Err(e) => {
                tracing::error!(
                    upstream_path_template = %context.route.upstream_path_template,
                    "Unable to configure downstream client: {}",
                    e
                );
                return Err(RequesterError::ClientConfiguration(e));
            }
        };

        let outcome = match context.request.to_http_request() {
            Ok(request) => {
                lease
                    .client()
                    .send(request, context.cancellation.as_ref())
                    .await
            }
            Err(e) => Err(e),
        };

        lease.save().await;

        outcome.map_err(|e| {
            let error = into_requester_error(e);
            tracing::warn!(
                http.method = %context.request.method(),
                http.url = context.request.original_url(),
                error.kind = %error.kind(),
                "Downstream request failed: {}",
                error
            );
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_classify_timeout_family() {
        assert_eq!(
            classify(&SendError::TimeoutRejected(Duration::from_secs(1))),
            ErrorKind::RequestTimedOut
        );
        assert_eq!(
            classify(&SendError::Cancelled("aborted".to_string())),
            ErrorKind::RequestTimedOut
        );
        assert_eq!(
            classify(&SendError::CircuitOpen("orders".to_string())),
            ErrorKind::RequestTimedOut
        );
    }

    #[test]
    fn test_classify_everything_else() {
        assert_eq!(
            classify(&SendError::InvalidRequest("bad".to_string())),
            ErrorKind::UnableToCompleteRequest
        );
        assert_eq!(
            classify(&SendError::Handler("boom".into())),
            ErrorKind::UnableToCompleteRequest
        );
        assert_eq!(
            classify(&SendError::MissingInnerHandler("auth")),
            ErrorKind::UnableToCompleteRequest
        );
    }

    #[test]
    fn test_error_keeps_cause() {
        let error = into_requester_error(SendError::CircuitOpen("billing".to_string()));
        assert_eq!(error.kind(), ErrorKind::RequestTimedOut);
        assert!(matches!(
            error,
            RequesterError::RequestTimedOut(SendError::CircuitOpen(ref name)) if name == "billing"
        ));
        assert_eq!(
            error.kind().status_code(),
            http::StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
