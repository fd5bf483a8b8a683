//! Redis rendezvous backend.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::KeyValueStore;
use argus_common::ArgusError;

/// Redis-backed key-value store
///
/// Uses a connection manager (auto-reconnecting) cloned per operation, the
/// same way the rest of the process talks to Redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis; fatal to debug-server startup if unreachable
    pub async fn connect(url: &str) -> Result<Self, ArgusError> {
        let client = redis::Client::open(url)
            .map_err(|e| ArgusError::Store(format!("invalid Redis URL {url}: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| ArgusError::Store(format!("failed to connect to {url}: {e}")))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ArgusError> {
        let mut conn = self.conn.clone();
        let wrote: bool = conn
            .set_nx(key, value)
            .await
            .map_err(|e| ArgusError::Store(e.to_string()))?;
        Ok(wrote)
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, ArgusError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = conn
            .mget(keys)
            .await
            .map_err(|e| ArgusError::Store(e.to_string()))?;
        Ok(values)
    }
}
