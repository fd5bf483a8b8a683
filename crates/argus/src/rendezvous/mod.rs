//! Rendezvous address publication and lookup.
//!
//! Workers publish their debug endpoint address under a prefix-scoped key
//! in a shared key-value store; the coordinator resolves the full address
//! table before fanning out. The store is consulted only at startup and at
//! the beginning of each fan-out pass, never on the hot path.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use argus_common::constants::keys;
use argus_common::{ArgusError, WorkerAddress};

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Minimal contract a rendezvous backend must satisfy.
///
/// Any strongly consistent key-value service providing a first-write-wins
/// single write and a snapshot multi-read is substitutable here.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Single write with first-write-wins semantics.
    ///
    /// Returns `false` if the key already existed (the write was discarded).
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ArgusError>;

    /// Snapshot read of several keys, values in request order.
    ///
    /// Absent keys come back as `None`; this call never blocks waiting for
    /// a key to appear.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, ArgusError>;
}

/// Prefix-scoped rendezvous client.
///
/// All keys live under a fixed prefix so the store instance can be shared
/// with unrelated coordination uses.
pub struct Rendezvous {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    resolve_timeout: Duration,
    poll_interval: Duration,
}

impl Rendezvous {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        prefix: impl Into<String>,
        resolve_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            resolve_timeout,
            poll_interval,
        }
    }

    /// Publish this rank's endpoint address.
    ///
    /// At most one writer per rank is expected; a lost first-write-wins
    /// race keeps the earlier value and is logged.
    pub async fn publish(&self, rank: usize, url: &str) -> Result<(), ArgusError> {
        let key = keys::rank(&self.prefix, rank);
        let wrote = self.store.set_nx(&key, url).await?;

        if !wrote {
            tracing::warn!(rank, key = %key, "Address already published for rank, keeping first value");
        } else {
            tracing::debug!(rank, url = %url, "Published worker address");
        }

        Ok(())
    }

    /// Resolve the addresses of all `world_size` ranks, in rank order.
    ///
    /// Workers publish at different wall-clock times, so this polls with a
    /// fixed interval until every key exists or the configured deadline
    /// expires. Expiry yields a typed timeout error naming the missing
    /// ranks rather than blocking forever.
    pub async fn resolve_all(&self, world_size: usize) -> Result<Vec<WorkerAddress>, ArgusError> {
        let keys: Vec<String> = (0..world_size)
            .map(|rank| keys::rank(&self.prefix, rank))
            .collect();
        let deadline = Instant::now() + self.resolve_timeout;

        loop {
            let values = self.store.multi_get(&keys).await?;

            if values.iter().all(Option::is_some) {
                return Ok(values
                    .into_iter()
                    .flatten()
                    .enumerate()
                    .map(|(rank, url)| WorkerAddress { rank, url })
                    .collect());
            }

            if Instant::now() >= deadline {
                let missing: Vec<usize> = values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_none())
                    .map(|(rank, _)| rank)
                    .collect();
                return Err(ArgusError::RendezvousTimeout(format!(
                    "ranks {:?} never published within {:?}",
                    missing, self.resolve_timeout
                )));
            }

            tracing::trace!(
                resolved = values.iter().filter(|v| v.is_some()).count(),
                total = world_size,
                "Waiting for remaining ranks to publish"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendezvous(store: Arc<dyn KeyValueStore>) -> Rendezvous {
        Rendezvous::new(
            store,
            "debug_server",
            Duration::from_millis(500),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn test_publish_resolve_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let rdv = rendezvous(store);

        rdv.publish(0, "http://host-a:1234").await.unwrap();
        rdv.publish(1, "http://host-b:5678").await.unwrap();

        let addrs = rdv.resolve_all(2).await.unwrap();
        assert_eq!(
            addrs,
            vec![
                WorkerAddress {
                    rank: 0,
                    url: "http://host-a:1234".to_string(),
                },
                WorkerAddress {
                    rank: 1,
                    url: "http://host-b:5678".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = Arc::new(MemoryStore::new());
        let rdv = rendezvous(store);

        rdv.publish(0, "http://first:1").await.unwrap();
        rdv.publish(0, "http://second:2").await.unwrap();

        let addrs = rdv.resolve_all(1).await.unwrap();
        assert_eq!(addrs[0].url, "http://first:1");
    }

    #[tokio::test]
    async fn test_resolve_waits_for_late_publisher() {
        let store = Arc::new(MemoryStore::new());
        let rdv = rendezvous(store.clone());

        rdv.publish(0, "http://early:1").await.unwrap();

        let late_store = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            late_store
                .set_nx("debug_server:rank1", "http://late:2")
                .await
                .unwrap();
        });

        let addrs = rdv.resolve_all(2).await.unwrap();
        let urls: Vec<&str> = addrs.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["http://early:1", "http://late:2"]);
    }

    #[tokio::test]
    async fn test_resolve_timeout_names_missing_ranks() {
        let store = Arc::new(MemoryStore::new());
        let rdv = Rendezvous::new(
            store,
            "debug_server",
            Duration::from_millis(120),
            Duration::from_millis(20),
        );

        rdv.publish(0, "http://only:1").await.unwrap();
        rdv.publish(2, "http://other:3").await.unwrap();

        let err = rdv.resolve_all(4).await.unwrap_err();
        match err {
            ArgusError::RendezvousTimeout(msg) => {
                assert!(msg.contains("[1, 3]"), "unexpected message: {msg}");
            }
            other => panic!("expected RendezvousTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keys_are_prefix_scoped() {
        let store = Arc::new(MemoryStore::new());
        let rdv = rendezvous(store.clone());

        rdv.publish(0, "http://host:1").await.unwrap();

        // A different prefix over the same store sees nothing.
        let other = Rendezvous::new(
            store,
            "unrelated",
            Duration::from_millis(50),
            Duration::from_millis(10),
        );
        assert!(other.resolve_all(1).await.is_err());
    }
}
