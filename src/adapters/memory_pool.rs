//! In-memory client pool.
//!
//! Keys map to FIFO queues of idle clients inside an `scc::HashMap`, so
//! synchronization is per bucket and creating the queue for an unseen key is
//! atomic with the first insert. Every idle client carries an expiry instant;
//! expired clients are skipped by `get` and removed by `evict_expired` (run
//! periodically by [`MemoryClientPool::spawn_sweeper`] when configured).
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use scc::HashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{DownstreamClient, PoolKey},
    ports::ClientPool,
};

struct IdleClient {
    client: DownstreamClient,
    /// `None` when the ttl overflows the clock: never expires
    expires_at: Option<Instant>,
}

impl IdleClient {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Concurrent key → FIFO queue store of idle downstream clients.
#[derive(Default)]
pub struct MemoryClientPool {
    clients: HashMap<PoolKey, VecDeque<IdleClient>>,
}

impl MemoryClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with an entry (empty queues included).
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Number of idle clients queued under a key, expired ones included.
    pub async fn idle_count(&self, key: &PoolKey) -> usize {
        self.clients
            .get_async(key)
            .await
            .map(|entry| entry.get().len())
            .unwrap_or(0)
    }

    /// Total idle clients across all keys.
    pub async fn total_idle(&self) -> usize {
        let mut total = 0;
        let total_ref = &mut total;
        self.clients
            .retain_async(|_, queue| {
                *total_ref += queue.len();
                true
            })
            .await;
        total
    }

    /// Drop every expired idle client. Entries stay in place even when their
    /// queue becomes empty. Returns the number of clients evicted.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        let evicted_ref = &mut evicted;
        self.clients
            .retain_async(|key, queue| {
                let before = queue.len();
                queue.retain(|idle| !idle.is_expired(now));
                let removed = before - queue.len();
                if removed > 0 {
                    tracing::debug!(pool.key = %key, removed, "Evicted expired clients");
                }
                *evicted_ref += removed;
                true
            })
            .await;
        evicted
    }

    /// Run `evict_expired` every `interval` until `shutdown` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Client pool sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = self.evict_expired().await;
                        if evicted > 0 {
                            tracing::info!(evicted, "Client pool sweep evicted expired clients");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl ClientPool for MemoryClientPool {
    async fn exists(&self, key: &PoolKey) -> bool {
        self.clients.get_async(key).await.is_some()
    }

    async fn get(&self, key: &PoolKey) -> Option<DownstreamClient> {
        let mut entry = self.clients.get_async(key).await?;
        let queue = entry.get_mut();
        let now = Instant::now();

        while let Some(idle) = queue.pop_front() {
            if !idle.is_expired(now) {
                return Some(idle.client);
            }
            tracing::debug!(pool.key = %key, client.id = %idle.client.id(), "Discarding expired client");
        }
        None
    }

    async fn set(&self, key: PoolKey, client: DownstreamClient, ttl: Duration) {
        let idle = IdleClient {
            client,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.clients
            .entry_async(key)
            .await
            .or_default()
            .get_mut()
            .push_back(idle);
    }

    async fn remove(&self, key: &PoolKey) {
        if self.clients.remove_async(key).await.is_some() {
            tracing::debug!(pool.key = %key, "Removed client pool entry");
        }
    }
}
