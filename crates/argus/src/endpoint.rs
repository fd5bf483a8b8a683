//! Worker debug endpoint.
//!
//! Embedded request server running inside every worker process. Binds an
//! ephemeral port (the concrete address is only known after bind, which is
//! why the rendezvous publish happens afterwards) and dispatches requests
//! to the injected handler registry.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::HandlerRegistry;
use argus_common::{HandlerReply, HandlerRequest};

/// Build the endpoint router around a frozen registry
pub fn router(registry: Arc<HandlerRegistry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/handler/{name}", any(dispatch))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Bind an ephemeral port and serve in the background.
///
/// Returns the bound address and the serving task; the caller publishes
/// the address to the rendezvous store. The registry must be fully
/// populated before this is called.
pub async fn start(
    registry: Arc<HandlerRegistry>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("0.0.0.0:0")
        .await
        .context("Failed to bind debug endpoint")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read bound endpoint address")?;

    let app = router(registry);
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown.recv().await;
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!(error = %e, "Debug endpoint server error");
        }
    });

    Ok((local_addr, task))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the endpoint serving?)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Look up the named handler and run it.
///
/// Unknown names answer 404 and leave the server running; a handler error
/// answers 500 so the caller can tell "asked, got an error" apart from
/// "couldn't ask".
async fn dispatch(
    State(registry): State<Arc<HandlerRegistry>>,
    Path(name): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let Some(handler) = registry.get(&name) else {
        tracing::debug!(name = %name, "Request for unknown handler");
        return (StatusCode::NOT_FOUND, format!("unknown handler: {name}")).into_response();
    };

    let req = HandlerRequest {
        method: method.to_string(),
        name: name.clone(),
        query,
        body: body.to_vec(),
    };

    match handler.handle(req).await {
        Ok(reply) => reply_response(reply),
        Err(e) => {
            tracing::error!(name = %name, error = %format!("{e:#}"), "Handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("handler {name} failed: {e:#}"),
            )
                .into_response()
        }
    }
}

fn reply_response(reply: HandlerReply) -> Response {
    let status =
        StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
        .into_response()
}
