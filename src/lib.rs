//! Downstream request execution for an API gateway.
//!
//! For every inbound request the gateway forwards to a backend ("downstream") service, this
//! crate obtains a configured, reusable outbound client, wraps its transport in an ordered
//! chain of delegating handlers, executes the call, and reduces every outcome to a
//! [`DownstreamResult`].
//!
//! # Features
//! - Elastic client pool keyed by `method:url`, with per-key FIFO queues and expiry tags
//! - Per-route cookie store, redirect policy, certificate-validation bypass and timeout
//! - Handler chains composed outermost-first from named, registrable factories
//! - Uniform error classification (`request_timed_out` / `unable_to_complete_request`)
//! - Structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use downstream_requester::{
//!     DownstreamContext, DownstreamRequest, HandlerRegistry, HttpRequester, MemoryClientPool,
//!     Requester, ReqwestTransportFactory, config::RequesterConfig,
//! };
//! use http::Method;
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config: RequesterConfig = downstream_requester::config::load_config("config.yaml").await?;
//! let requester = HttpRequester::new(
//!     Arc::new(MemoryClientPool::new()),
//!     Arc::new(ReqwestTransportFactory),
//!     Arc::new(HandlerRegistry::from_config(&config)),
//!     config.settings()?,
//! );
//!
//! let route = Arc::new(config.routes["orders"].clone());
//! let request = DownstreamRequest::new(Method::GET, "http://orders.internal/api/orders");
//! let response = requester
//!     .get_response(&DownstreamContext::new(route, request))
//!     .await?;
//! println!("{}", response.status());
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the build/send/classify logic inside `core`.
//!
//! # Concurrency & Data Structures
//! The client pool uses `scc::HashMap` so that per-key queues are locked per bucket and the
//! first insert for an unseen key never races with a concurrent one.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{HandlerRegistry, MemoryClientPool, ReqwestTransportFactory, TransportHandler},
    core::{
        ClientBuilder, ClientLease, DownstreamClient, DownstreamContext, DownstreamRequest,
        HttpRequester, PoolKey, RequesterSettings,
    },
    ports::{
        ClientPool, DownstreamResult, ErrorKind, Handler, HandlerChainSource, Requester,
        RequesterError, SendError,
    },
};
