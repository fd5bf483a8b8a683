//! # Argus - Distributed Debug Aggregator
//!
//! Every worker in a distributed job runs this process alongside its main
//! work: a debug endpoint on an ephemeral port, its address published to a
//! shared rendezvous store. Rank 0 additionally serves the coordinator
//! surface, fanning diagnostic requests out to every rank and aggregating
//! the outcomes.
//!
//! ## Architecture
//! ```text
//! operator → Coordinator (rank 0) → Worker endpoints (rank 0..N-1)
//!                  ↓
//!              Redis (address rendezvous)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod bootstrap;
mod config;
mod coordinator;
mod endpoint;
mod fanout;
mod handlers;
mod rendezvous;

use crate::config::{AppConfig, StoreBackend};
use crate::rendezvous::{KeyValueStore, MemoryStore, RedisStore};

/// Argus - cluster-wide diagnostic aggregator
#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/argus.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// This process's rank (overrides config)
    #[arg(long, env = "RANK")]
    rank: Option<usize>,

    /// Total number of ranks (overrides config)
    #[arg(long, env = "WORLD_SIZE")]
    world_size: Option<usize>,

    /// Host other processes reach this worker at (overrides config)
    #[arg(long, env = "ADVERTISE_HOST")]
    advertise_host: Option<String>,

    /// Coordinator listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🔭 Starting Argus v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!(
        rank = config.rank,
        world_size = config.world_size,
        "📋 Configuration loaded"
    );

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Connect to the rendezvous store
    let store: Arc<dyn KeyValueStore> = match config.rendezvous.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url)
                .await
                .context("Failed to connect to rendezvous store")?;
            info!("✅ Rendezvous store connected: {}", config.redis_url);
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("Using in-process rendezvous store");
            Arc::new(MemoryStore::new())
        }
    };

    // Freeze the handler registry, then bring up the debug plane
    let registry = bootstrap::default_registry(config.rank);
    let server = bootstrap::enable_debug_server(&config, registry, store, &shutdown_tx).await?;

    info!(endpoint = %server.endpoint_addr, "🚀 Argus running");

    // Handle graceful shutdown
    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    info!("🛑 Shutdown signal received");
    let _ = shutdown_tx.send(());

    for task in server.tasks {
        let _ = task.await;
    }

    info!("👋 Argus shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
