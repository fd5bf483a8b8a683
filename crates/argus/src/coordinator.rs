//! Coordinator-facing HTTP surface.
//!
//! Served by the designated coordinator (rank 0). Exposes fan-out results
//! as JSON; turning that into HTML or trace-viewer payloads is the
//! presentation layer's job, not this crate's.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::fanout::FanOutEngine;
use argus_common::FanOutReport;

/// Build the coordinator router around the fan-out engine
pub fn router(engine: Arc<FanOutEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fanout/{handler}", get(run_fanout))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Bind the configured address and serve in the background
pub async fn start(
    listen_addr: &str,
    engine: Arc<FanOutEngine>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind coordinator server on {listen_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read bound coordinator address")?;

    let app = router(engine);
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown.recv().await;
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!(error = %e, "Coordinator server error");
        }
    });

    Ok((local_addr, task))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run one fan-out pass against the named handler.
///
/// The raw query string is forwarded verbatim to every worker. A partial
/// result still renders - per-rank failures are entries in the report, and
/// only whole-operation failures (rendezvous, overall deadline) map to an
/// error status here.
async fn run_fanout(
    State(engine): State<Arc<FanOutEngine>>,
    Path(handler): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<FanOutReport>, (StatusCode, String)> {
    engine
        .fan_out(&handler, query.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(handler = %handler, error = %e, "Diagnostic pass failed");
            (
                StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FanOutConfig;
    use crate::endpoint;
    use crate::handlers::{HandlerRegistry, PingHandler};
    use crate::rendezvous::{MemoryStore, Rendezvous};
    use std::time::Duration;

    async fn spawn_coordinator(engine: FanOutEngine) -> String {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
        let (addr, _task) = start("127.0.0.1:0", Arc::new(engine), shutdown_tx.subscribe())
            .await
            .unwrap();
        std::mem::forget(shutdown_tx);
        format!("http://127.0.0.1:{}", addr.port())
    }

    fn test_rendezvous(store: Arc<MemoryStore>) -> Arc<Rendezvous> {
        Arc::new(Rendezvous::new(
            store,
            "debug_server",
            Duration::from_millis(200),
            Duration::from_millis(20),
        ))
    }

    #[tokio::test]
    async fn test_fanout_route_returns_report_json() {
        let store = Arc::new(MemoryStore::new());
        let rendezvous = test_rendezvous(store);

        for rank in 0..2 {
            let mut registry = HandlerRegistry::new();
            registry.register("ping", Arc::new(PingHandler));
            let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
            let (addr, _task) = endpoint::start(Arc::new(registry), shutdown_tx.subscribe())
                .await
                .unwrap();
            std::mem::forget(shutdown_tx);
            rendezvous
                .publish(rank, &format!("http://127.0.0.1:{}", addr.port()))
                .await
                .unwrap();
        }

        let engine = FanOutEngine::new(rendezvous, 2, &FanOutConfig::default()).unwrap();
        let base = spawn_coordinator(engine).await;

        let resp = reqwest::get(format!("{base}/fanout/ping")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let report: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(report["handler"], "ping");
        let entries = report["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        for (rank, entry) in entries.iter().enumerate() {
            assert_eq!(entry["rank"], rank as u64);
            assert_eq!(entry["outcome"]["kind"], "success");
            assert_eq!(entry["outcome"]["status"], 200);
            // Opaque payloads travel base64-encoded: "pong"
            assert_eq!(entry["outcome"]["body"], "cG9uZw==");
        }
    }

    #[tokio::test]
    async fn test_rendezvous_timeout_maps_to_504() {
        let store = Arc::new(MemoryStore::new());
        let rendezvous = test_rendezvous(store);

        // World size 1, nothing ever publishes.
        let engine = FanOutEngine::new(rendezvous, 1, &FanOutConfig::default()).unwrap();
        let base = spawn_coordinator(engine).await;

        let resp = reqwest::get(format!("{base}/fanout/ping")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 504);
    }

    #[tokio::test]
    async fn test_health() {
        let store = Arc::new(MemoryStore::new());
        let engine =
            FanOutEngine::new(test_rendezvous(store), 1, &FanOutConfig::default()).unwrap();
        let base = spawn_coordinator(engine).await;

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }
}
