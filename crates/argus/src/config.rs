//! Configuration management for Argus.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use argus_common::constants::{
    DEFAULT_ADVERTISE_HOST, DEFAULT_COORDINATOR_ADDR, DEFAULT_FANOUT_CONCURRENCY,
    DEFAULT_FANOUT_DEADLINE_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REDIS_URL,
    DEFAULT_RENDEZVOUS_PREFIX, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RESOLVE_TIMEOUT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL (the rendezvous store)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// This process's rank (0..world_size)
    #[serde(default)]
    pub rank: usize,

    /// Total number of ranks in the job
    #[serde(default = "default_world_size")]
    pub world_size: usize,

    /// Host other processes can reach this worker's endpoint at
    #[serde(default = "default_advertise_host")]
    pub advertise_host: String,

    /// Coordinator HTTP listen address (rank 0 only)
    #[serde(default = "default_coordinator_addr")]
    pub coordinator_addr: String,

    /// Rendezvous configuration
    #[serde(default)]
    pub rendezvous: RendezvousConfig,

    /// Fan-out configuration
    #[serde(default)]
    pub fanout: FanOutConfig,
}

/// Rendezvous backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance, reachable by every rank
    #[default]
    Redis,
    /// In-process map; only valid for single-process jobs
    Memory,
}

/// Rendezvous-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendezvousConfig {
    /// Which store implementation backs the rendezvous
    #[serde(default)]
    pub backend: StoreBackend,

    /// Key prefix scoping debug-server keys inside the shared store
    #[serde(default = "default_rendezvous_prefix")]
    pub prefix: String,

    /// Bound on waiting for all ranks to publish (seconds)
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// Interval between resolution polls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl RendezvousConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            prefix: default_rendezvous_prefix(),
            resolve_timeout_secs: default_resolve_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Fan-out specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FanOutConfig {
    /// Maximum concurrent in-flight requests, independent of world size
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline for a whole fan-out pass (seconds)
    #[serde(default = "default_fanout_deadline")]
    pub deadline_secs: u64,
}

impl FanOutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
            deadline_secs: default_fanout_deadline(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_world_size() -> usize { 1 }
fn default_advertise_host() -> String { DEFAULT_ADVERTISE_HOST.to_string() }
fn default_coordinator_addr() -> String { DEFAULT_COORDINATOR_ADDR.to_string() }
fn default_rendezvous_prefix() -> String { DEFAULT_RENDEZVOUS_PREFIX.to_string() }
fn default_resolve_timeout() -> u64 { DEFAULT_RESOLVE_TIMEOUT_SECS }
fn default_poll_interval() -> u64 { DEFAULT_POLL_INTERVAL_MS }
fn default_concurrency() -> usize { DEFAULT_FANOUT_CONCURRENCY }
fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
fn default_fanout_deadline() -> u64 { DEFAULT_FANOUT_DEADLINE_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(rank) = args.rank {
            config.rank = rank;
        }
        if let Some(world_size) = args.world_size {
            config.world_size = world_size;
        }
        if let Some(ref host) = args.advertise_host {
            config.advertise_host = host.clone();
        }
        if let Some(ref listen) = args.listen {
            config.coordinator_addr = listen.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate process identity; fatal at startup if malformed
    pub fn validate(&self) -> Result<()> {
        if self.world_size == 0 {
            anyhow::bail!("world_size must be at least 1");
        }
        if self.rank >= self.world_size {
            anyhow::bail!(
                "rank {} out of range for world_size {}",
                self.rank,
                self.world_size
            );
        }
        if self.fanout.concurrency == 0 {
            anyhow::bail!("fanout.concurrency must be at least 1");
        }
        if self.rendezvous.backend == StoreBackend::Memory && self.world_size > 1 {
            anyhow::bail!("in-process rendezvous store cannot serve world_size > 1");
        }
        Ok(())
    }

    /// Is this process the designated coordinator?
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            rank: 0,
            world_size: default_world_size(),
            advertise_host: default_advertise_host(),
            coordinator_addr: default_coordinator_addr(),
            rendezvous: RendezvousConfig::default(),
            fanout: FanOutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.rank, 0);
        assert_eq!(config.world_size, 1);
        assert_eq!(config.fanout.concurrency, 10);
        assert!(config.is_coordinator());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rank_out_of_range() {
        let config = AppConfig {
            rank: 4,
            world_size: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_world_size() {
        let config = AppConfig {
            world_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_backend_is_single_process_only() {
        let config = AppConfig {
            rank: 0,
            world_size: 2,
            rendezvous: RendezvousConfig {
                backend: StoreBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency() {
        let config = AppConfig {
            fanout: FanOutConfig {
                concurrency: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
