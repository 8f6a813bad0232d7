pub mod client_factory;
pub mod client_pool;
pub mod handler;
pub mod handler_chain;
pub mod requester;
pub mod transport;

pub use client_factory::ClientFactory;
pub use client_pool::ClientPool;
pub use handler::{
    BoxError, DelegatingHandler, Handler, HandlerResult, InnerHandler, SendError,
};
pub use handler_chain::{ChainError, HandlerChainSource, HandlerFactory};
pub use requester::{DownstreamResult, ErrorKind, Requester, RequesterError};
pub use transport::{MAX_REDIRECTS, TransportFactory, TransportOptions};
