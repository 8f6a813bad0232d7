use std::sync::Arc;

use crate::{
    config::DownstreamRoute,
    ports::handler::{BoxError, Handler},
};

/// Redirect hops followed when a route allows auto-redirect.
pub const MAX_REDIRECTS: usize = 10;

/// Per-client transport policy derived from a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Attach a fresh cookie store owned by this client
    pub use_cookie_container: bool,
    /// Follow redirects (up to [`MAX_REDIRECTS`])
    pub allow_auto_redirect: bool,
    /// Accept any server certificate
    pub accept_any_server_certificate: bool,
}

impl From<&DownstreamRoute> for TransportOptions {
    fn from(route: &DownstreamRoute) -> Self {
        Self {
            use_cookie_container: route.use_cookie_container,
            allow_auto_redirect: route.allow_auto_redirect,
            accept_any_server_certificate: route.accept_any_server_certificate,
        }
    }
}

/// Builds the innermost handler of a chain: the one that talks to the network.
pub trait TransportFactory: Send + Sync + 'static {
    fn create_transport(&self, options: &TransportOptions) -> Result<Arc<dyn Handler>, BoxError>;
}
