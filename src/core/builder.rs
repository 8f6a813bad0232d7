//! Resolution of the outbound client for a request.
//!
//! A request first tries to take an idle client from the pool under its
//! [`PoolKey`]. On a miss a new client is built from the route policy:
//! transport (cookies, redirects, certificate bypass), timeout, logical name
//! and the route's delegating handler chain. A pooled client is reused as-is;
//! nothing from the current route is re-applied to it.
//!
//! The resolved client comes back wrapped in a [`ClientLease`] which returns
//! it to the pool exactly once, either through [`ClientLease::save`] or, for
//! early exits, when the lease is dropped.
use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    config::DownstreamRoute,
    core::{
        client::{DefaultClientFactory, DownstreamClient},
        context::{DownstreamContext, PoolKey},
    },
    ports::{
        BoxError, ChainError, ClientFactory, ClientPool, Handler, HandlerChainSource,
        HandlerFactory, TransportFactory, TransportOptions,
    },
};

/// Timeout used when a route leaves `timeout_ms` at 0.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Logical client name used when a route has no service name.
pub const DEFAULT_CLIENT_NAME: &str = "default";

/// Expiry tag recorded when a client goes back to the pool.
pub const DEFAULT_POOL_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors raised while configuring a new client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BuildError {
    /// The handler chain for the route could not be resolved
    #[error("Handler chain resolution failed: {0}")]
    Chain(#[from] ChainError),

    /// The base transport could not be constructed
    #[error("Transport construction failed: {0}")]
    Transport(#[source] BoxError),
}

/// Settings shared by every builder of a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterSettings {
    pub default_timeout: Duration,
    pub default_client_name: String,
    pub pool_expiry: Duration,
}

impl Default for RequesterSettings {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            default_client_name: DEFAULT_CLIENT_NAME.to_string(),
            pool_expiry: DEFAULT_POOL_EXPIRY,
        }
    }
}

/// Effective client timeout for a route.
pub fn resolve_timeout(timeout_ms: u64, default: Duration) -> Duration {
    if timeout_ms == 0 {
        default
    } else {
        Duration::from_millis(timeout_ms)
    }
}

/// Effective logical client name for a route.
pub fn resolve_client_name<'a>(service_name: Option<&'a str>, default: &'a str) -> &'a str {
    match service_name {
        Some(name) if !name.is_empty() => name,
        _ => default,
    }
}

/// Wrap `base` with the handlers produced by `factories`.
///
/// The list is walked in reverse so that the first factory ends up outermost
/// and the last one sits right next to the transport.
pub fn compose_chain(base: Arc<dyn Handler>, factories: &[HandlerFactory]) -> Arc<dyn Handler> {
    factories.iter().rev().fold(base, |inner, factory| {
        let mut handler = factory();
        handler.set_inner(inner);
        Arc::new(handler) as Arc<dyn Handler>
    })
}

/// Per-request client resolver. Cheap to create; owns only shared references.
#[derive(Clone)]
pub struct ClientBuilder {
    pool: Arc<dyn ClientPool>,
    transports: Arc<dyn TransportFactory>,
    chains: Arc<dyn HandlerChainSource>,
    clients: Arc<dyn ClientFactory>,
    settings: Arc<RequesterSettings>,
}

impl ClientBuilder {
    pub fn new(
        pool: Arc<dyn ClientPool>,
        transports: Arc<dyn TransportFactory>,
        chains: Arc<dyn HandlerChainSource>,
        settings: Arc<RequesterSettings>,
    ) -> Self {
        Self {
            pool,
            transports,
            chains,
            clients: Arc::new(DefaultClientFactory),
            settings,
        }
    }

    /// Replace the named-client facility.
    pub fn with_client_factory(mut self, clients: Arc<dyn ClientFactory>) -> Self {
        self.clients = clients;
        self
    }

    /// Take a pooled client for the request or build a new one.
    pub async fn create(&self, context: &DownstreamContext) -> Result<ClientLease, BuildError> {
        let key = context.pool_key();
        tracing::debug!(pool.key = %key, "Cache key for request is {}", key);

        if let Some(client) = self.pool.get(&key).await {
            tracing::debug!(
                pool.key = %key,
                client.id = %client.id(),
                "Reusing pooled downstream client"
            );
            return Ok(self.lease(key, client, true));
        }

        let client = self.build_client(&context.route)?;
        tracing::debug!(
            pool.key = %key,
            client.id = %client.id(),
            client.name = client.name(),
            client.timeout_ms = client.timeout().as_millis() as u64,
            "Built new downstream client"
        );
        Ok(self.lease(key, client, false))
    }

    /// Build a brand-new client for a route, bypassing the pool.
    pub fn build_client(&self, route: &DownstreamRoute) -> Result<DownstreamClient, BuildError> {
        let options = TransportOptions::from(route);
        let transport = self
            .transports
            .create_transport(&options)
            .map_err(BuildError::Transport)?;

        let timeout = resolve_timeout(route.timeout_ms, self.settings.default_timeout);
        let name = resolve_client_name(
            route.service_name.as_deref(),
            &self.settings.default_client_name,
        );

        let factories = self.chains.get(route)?;
        let primary = compose_chain(transport, &factories);

        if options.accept_any_server_certificate {
            tracing::warn!(
                upstream_path_template = %route.upstream_path_template,
                downstream_path_template = %route.downstream_path_template,
                "You have ignored all SSL warnings by accepting any server certificate for this downstream route, UpstreamPathTemplate: {}, DownstreamPathTemplate: {}",
                route.upstream_path_template,
                route.downstream_path_template
            );
        }

        let mut client = self.clients.create_client(name, primary);
        client.set_timeout(timeout);
        Ok(client)
    }

    fn lease(&self, key: PoolKey, client: DownstreamClient, reused: bool) -> ClientLease {
        ClientLease {
            key,
            client: Some(client),
            pool: Arc::clone(&self.pool),
            ttl: self.settings.pool_expiry,
            reused,
        }
    }
}

/// Exclusive use of one client, returned to the pool exactly once.
pub struct ClientLease {
    key: PoolKey,
    client: Option<DownstreamClient>,
    pool: Arc<dyn ClientPool>,
    ttl: Duration,
    reused: bool,
}

impl ClientLease {
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    pub fn client(&self) -> &DownstreamClient {
        // Only `save` and `drop` take the client, and both consume the lease.
        self.client
            .as_ref()
            .expect("lease holds its client until released")
    }

    /// Whether the client came out of the pool rather than a cold build.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// Return the client to the pool under the lease key.
    pub async fn save(mut self) {
        if let Some(client) = self.client.take() {
            tracing::debug!(pool.key = %self.key, client.id = %client.id(), "Returning client to pool");
            self.pool.set(self.key.clone(), client, self.ttl).await;
        }
    }
}

impl Drop for ClientLease {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        let pool = Arc::clone(&self.pool);
        let key = self.key.clone();
        let ttl = self.ttl;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(pool.key = %key, client.id = %client.id(), "Lease dropped, returning client to pool");
                handle.spawn(async move { pool.set(key, client, ttl).await });
            }
            Err(_) => {
                tracing::warn!(pool.key = %key, client.id = %client.id(), "Lease dropped outside a runtime, client discarded");
            }
        }
    }
}

impl std::fmt::Debug for ClientLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLease")
            .field("key", &self.key)
            .field("client", &self.client)
            .field("ttl", &self.ttl)
            .field("reused", &self.reused)
            .finish_non_exhaustive()
    }
}
