//! The external key-value store the pipeline leans on for durability across
//! restarts. The trait is deliberately narrow: the monitors only ever need
//! plain gets and sets, one hash per snapshot, and expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Sum type for everything that can go wrong talking to the store.
#[derive(Debug)]
pub enum StoreError {
    Pool(String),
    Redis(deadpool_redis::redis::RedisError),
}

impl From<deadpool_redis::redis::RedisError> for StoreError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        StoreError::Redis(e)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            StoreError::Pool(e) => format!("Store connection unavailable: {}", e),
            StoreError::Redis(e) => format!("Store command failed: {}", e),
        };

        write!(f, "{}", x)
    }
}

/// The store operations the pipeline depends on. Implementations must be
/// safe to share across the polling tasks.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a scalar, optionally with a time-to-live. A `None` TTL means the
    /// value survives until overwritten or deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Round-trip liveness check, used once at startup before the monitors
    /// are released.
    async fn ping(&self) -> Result<(), StoreError>;
}
