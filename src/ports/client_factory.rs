use std::sync::Arc;

use crate::{core::DownstreamClient, ports::handler::Handler};

/// Named-client facility: builds a client around a primary handler.
pub trait ClientFactory: Send + Sync + 'static {
    /// Create a client identified by its logical `name`.
    fn create_client(&self, name: &str, primary: Arc<dyn Handler>) -> DownstreamClient;
}
