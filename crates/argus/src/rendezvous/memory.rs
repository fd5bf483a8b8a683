//! In-process rendezvous backend.
//!
//! Backs single-host runs and tests; the contract is identical to the
//! Redis backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::KeyValueStore;
use argus_common::ArgusError;

/// In-memory key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ArgusError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, ArgusError> {
        let entries = self.entries.read().await;
        Ok(keys.iter().map(|k| entries.get(k).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_nx_round_trip() {
        let store = MemoryStore::new();

        assert!(store.set_nx("k", "v1").await.unwrap());
        assert!(!store.set_nx("k", "v2").await.unwrap());

        let values = store
            .multi_get(&["k".to_string(), "absent".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("v1".to_string()), None]);
    }
}
