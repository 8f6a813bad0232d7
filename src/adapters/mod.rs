pub mod handler_registry;
pub mod handlers;
pub mod memory_pool;
pub mod transport;

/// Re-export commonly used types from adapters
pub use handler_registry::HandlerRegistry;
pub use handlers::{HeaderInjectionHandler, RequestIdHandler, TracingHandler};
pub use memory_pool::MemoryClientPool;
pub use transport::{ReqwestTransportFactory, TransportHandler};
