use std::sync::Arc;

use thiserror::Error;

use crate::{config::DownstreamRoute, ports::handler::DelegatingHandler};

/// Zero-argument constructor producing one fresh delegating handler.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn DelegatingHandler> + Send + Sync>;

/// Errors raised while resolving the handler chain of a route
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChainError {
    /// The route references a handler nobody registered
    #[error("Unknown delegating handler '{name}' for route '{route}'")]
    UnknownHandler {
        /// Handler name as listed by the route
        name: String,
        /// Upstream path template of the route
        route: String,
    },

    /// The source could not produce a chain for another reason
    #[error("Handler chain unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the ordered cross-cutting handlers for a route.
///
/// The first factory in the returned list produces the outermost handler.
pub trait HandlerChainSource: Send + Sync + 'static {
    fn get(&self, route: &DownstreamRoute) -> Result<Vec<HandlerFactory>, ChainError>;
}
