//! Shared constants for Argus components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default coordinator HTTP listen address
pub const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:25999";

/// Default host workers advertise in their published address
pub const DEFAULT_ADVERTISE_HOST: &str = "127.0.0.1";

/// Default rendezvous key prefix
pub const DEFAULT_RENDEZVOUS_PREFIX: &str = "debug_server";

/// Default bound on rendezvous resolution (seconds)
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 60;

/// Default rendezvous poll interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default per-request timeout during a fan-out (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a whole fan-out pass (seconds)
pub const DEFAULT_FANOUT_DEADLINE_SECS: u64 = 120;

/// Default bound on concurrent in-flight fan-out requests
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 10;

/// Path prefix under which workers expose their diagnostic handlers
pub const HANDLER_PATH: &str = "/handler";

/// Rendezvous key layout
pub mod keys {
    /// Key a worker publishes its address under: {prefix}:rank{N}
    pub fn rank(prefix: &str, rank: usize) -> String {
        format!("{}:rank{}", prefix, rank)
    }
}
