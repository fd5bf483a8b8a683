//! Process lifecycle: endpoint bring-up, address publication, coordinator
//! startup.
//!
//! Order matters: the registry is frozen first, the endpoint binds its
//! ephemeral port, and only then is the resulting address published to the
//! rendezvous store. The designated coordinator (rank 0) additionally
//! starts the coordinator-facing server.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::coordinator;
use crate::endpoint;
use crate::fanout::FanOutEngine;
use crate::handlers::{HandlerRegistry, PingHandler, ProcessInfoHandler};
use crate::rendezvous::{KeyValueStore, Rendezvous};

/// Running debug-server handles for one process
pub struct DebugServer {
    /// Address the worker endpoint actually bound
    pub endpoint_addr: SocketAddr,

    /// Address published to the rendezvous store
    pub published_url: String,

    /// Coordinator listen address (rank 0 only)
    pub coordinator_addr: Option<SocketAddr>,

    /// Server tasks; join after signalling shutdown
    pub tasks: Vec<JoinHandle<()>>,
}

/// Registry every worker starts with.
///
/// External collaborators (stack dumper, flight recorder, profiler) add
/// their handlers to this before `enable_debug_server` freezes it.
pub fn default_registry(rank: usize) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("ping", Arc::new(PingHandler));
    registry.register("process_info", Arc::new(ProcessInfoHandler::new(rank)));
    registry
}

/// Bring up the debug plane for this process.
///
/// Failures here are fatal to debug-server startup, not to the main job -
/// the caller decides whether to continue without diagnostics.
pub async fn enable_debug_server(
    config: &AppConfig,
    registry: HandlerRegistry,
    store: Arc<dyn KeyValueStore>,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<DebugServer> {
    let registry = Arc::new(registry);
    info!(
        rank = config.rank,
        handlers = ?registry.names(),
        "Starting debug endpoint"
    );

    let (endpoint_addr, endpoint_task) =
        endpoint::start(registry, shutdown_tx.subscribe()).await?;

    // The concrete port exists only now; publish after bind.
    let published_url = format!("http://{}:{}", config.advertise_host, endpoint_addr.port());
    let rendezvous = Arc::new(Rendezvous::new(
        store,
        config.rendezvous.prefix.clone(),
        config.rendezvous.resolve_timeout(),
        config.rendezvous.poll_interval(),
    ));
    rendezvous
        .publish(config.rank, &published_url)
        .await
        .context("Failed to publish worker address")?;
    info!(rank = config.rank, url = %published_url, "Debug endpoint published");

    let mut tasks = vec![endpoint_task];
    let coordinator_addr = if config.is_coordinator() {
        let engine = Arc::new(FanOutEngine::new(
            rendezvous,
            config.world_size,
            &config.fanout,
        )?);
        let (addr, task) =
            coordinator::start(&config.coordinator_addr, engine, shutdown_tx.subscribe())
                .await?;
        info!(addr = %addr, "Coordinator server started");
        tasks.push(task);
        Some(addr)
    } else {
        None
    };

    Ok(DebugServer {
        endpoint_addr,
        published_url,
        coordinator_addr,
        tasks,
    })
}
