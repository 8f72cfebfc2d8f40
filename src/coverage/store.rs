// src/coverage/store.rs

//! Coverage state store: in-memory cache over a durable backend, plus the
//! per-room lock table that serializes every read-modify-write for a room.
//!
//! Write discipline: persist first, update the cache only after the write
//! succeeded. A failed write leaves state unchanged until the next mutating
//! event retries it implicitly; there is no synchronous retry loop.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::types::CoverageState;

/// Durable persistence seam. One row per room.
#[async_trait]
pub trait CoverageBackend: Send + Sync {
    /// Hydration read, called once at startup.
    async fn load_all(&self) -> Result<Vec<CoverageState>>;

    /// Atomic per-room upsert.
    async fn upsert(&self, state: &CoverageState) -> Result<()>;
}

/// Per-room mutual exclusion. Mention, strike, and pump-driven mutations
/// for the same room must not interleave; different rooms are independent.
#[derive(Default)]
pub struct RoomLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for a room.
    pub async fn get_lock(&self, destination_id: &str) -> Arc<Mutex<()>> {
        // Fast path: lock already exists
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(destination_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(destination_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct CoverageStore {
    backend: Arc<dyn CoverageBackend>,
    cache: RwLock<HashMap<String, CoverageState>>,
    locks: RoomLocks,
}

impl CoverageStore {
    pub fn new(backend: Arc<dyn CoverageBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
            locks: RoomLocks::new(),
        }
    }

    /// Hydrate the cache from durable storage. Called once at startup.
    pub async fn hydrate(&self) -> Result<usize> {
        let states = self.backend.load_all().await?;
        let count = states.len();

        let mut cache = self.cache.write().await;
        for state in states {
            cache.insert(state.destination_id.clone(), state);
        }

        debug!("Hydrated {} coverage records", count);
        Ok(count)
    }

    pub async fn get(&self, destination_id: &str) -> Option<CoverageState> {
        self.cache.read().await.get(destination_id).cloned()
    }

    /// Persist, then make visible. The cache never holds a value that is
    /// not durable yet.
    pub async fn put(&self, state: &CoverageState) -> Result<()> {
        self.backend.upsert(state).await?;

        let mut cache = self.cache.write().await;
        cache.insert(state.destination_id.clone(), state.clone());
        Ok(())
    }

    /// The mutual-exclusion unit for a room. Hold it across the whole
    /// read-modify-write.
    pub async fn lock(&self, destination_id: &str) -> Arc<Mutex<()>> {
        self.locks.get_lock(destination_id).await
    }
}
