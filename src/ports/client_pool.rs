use std::time::Duration;

use async_trait::async_trait;

use crate::core::{DownstreamClient, PoolKey};

/// Store of idle, fully configured downstream clients keyed by [`PoolKey`].
///
/// Each key maps to a FIFO queue. `get` is a destructive dequeue so a client
/// is never handed to two callers at once.
#[async_trait]
pub trait ClientPool: Send + Sync + 'static {
    /// Whether an entry (empty or not) exists for the key.
    async fn exists(&self, key: &PoolKey) -> bool;

    /// Remove and return one idle client for the key, if any.
    async fn get(&self, key: &PoolKey) -> Option<DownstreamClient>;

    /// Append a client to the key's queue, creating the queue when absent.
    async fn set(&self, key: PoolKey, client: DownstreamClient, ttl: Duration);

    /// Discard the whole entry for the key.
    async fn remove(&self, key: &PoolKey);
}
