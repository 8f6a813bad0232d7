pub mod builder;
pub mod client;
pub mod context;
pub mod requester;

pub use builder::{
    BuildError, ClientBuilder, ClientLease, DEFAULT_CLIENT_NAME, DEFAULT_POOL_EXPIRY,
    DEFAULT_TIMEOUT, RequesterSettings,
};
pub use client::{ClientId, DefaultClientFactory, DownstreamClient};
pub use context::{DownstreamContext, DownstreamRequest, PoolKey};
pub use requester::{HttpRequester, classify};
