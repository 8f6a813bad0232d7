use async_trait::async_trait;
use axum::{
    body::Body as AxumBody,
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
};
use http::Response;
use thiserror::Error;

use crate::{
    core::{BuildError, DownstreamContext},
    ports::handler::SendError,
};

/// Category of a failed downstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timeout policy rejection, cancellation or open circuit
    RequestTimedOut,
    /// Any other failure while sending
    UnableToCompleteRequest,
    /// The client for the route could not be configured
    ClientConfiguration,
}

impl ErrorKind {
    /// Status the gateway answers with when the call fails this way.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::RequestTimedOut => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::UnableToCompleteRequest => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::ClientConfiguration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::RequestTimedOut => write!(f, "request_timed_out"),
            ErrorKind::UnableToCompleteRequest => write!(f, "unable_to_complete_request"),
            ErrorKind::ClientConfiguration => write!(f, "client_configuration"),
        }
    }
}

/// Error half of [`DownstreamResult`]: the kind plus the original cause.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequesterError {
    #[error("Request to downstream timed out: {0}")]
    RequestTimedOut(#[source] SendError),

    #[error("Unable to complete request to downstream: {0}")]
    UnableToCompleteRequest(#[source] SendError),

    #[error("Failed to configure downstream client: {0}")]
    ClientConfiguration(#[source] BuildError),
}

impl RequesterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequesterError::RequestTimedOut(_) => ErrorKind::RequestTimedOut,
            RequesterError::UnableToCompleteRequest(_) => ErrorKind::UnableToCompleteRequest,
            RequesterError::ClientConfiguration(_) => ErrorKind::ClientConfiguration,
        }
    }
}

impl IntoResponse for RequesterError {
    fn into_response(self) -> AxumResponse {
        let status = self.kind().status_code();
        (status, self.to_string()).into_response()
    }
}

/// Outcome of one downstream call.
pub type DownstreamResult = Result<Response<AxumBody>, RequesterError>;

/// Executes a request against the downstream selected for it.
#[async_trait]
pub trait Requester: Send + Sync + 'static {
    async fn get_response(&self, context: &DownstreamContext) -> DownstreamResult;
}
