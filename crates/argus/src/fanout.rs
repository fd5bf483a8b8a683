//! Coordinator fan-out engine.
//!
//! Resolves the full worker address table from the rendezvous store, issues
//! one request per rank against a named handler with bounded concurrency,
//! and aggregates the heterogeneous outcomes into a single rank-ordered
//! report. Per-worker failures are data in the report; only rendezvous
//! resolution failure or the overall deadline fail the pass as a whole.

use futures::{StreamExt, stream};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FanOutConfig;
use crate::rendezvous::Rendezvous;
use argus_common::constants::HANDLER_PATH;
use argus_common::{
    ArgusError, FanOutReport, HandlerReply, RankOutcome, RankResult, WorkerAddress,
};

/// Fan-out/fan-in engine run by the coordinator.
pub struct FanOutEngine {
    rendezvous: Arc<Rendezvous>,
    client: reqwest::Client,
    world_size: usize,
    concurrency: usize,
    deadline: Duration,
}

impl FanOutEngine {
    pub fn new(
        rendezvous: Arc<Rendezvous>,
        world_size: usize,
        config: &FanOutConfig,
    ) -> Result<Self, ArgusError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ArgusError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            rendezvous,
            client,
            world_size,
            concurrency: config.concurrency,
            deadline: config.deadline(),
        })
    }

    /// Ask every rank to run the named handler.
    ///
    /// Returns exactly `world_size` entries in ascending rank order no
    /// matter which workers answered, and in what order, on the wire. The
    /// optional query string is forwarded verbatim to every worker.
    pub async fn fan_out(
        &self,
        handler: &str,
        query: Option<&str>,
    ) -> Result<FanOutReport, ArgusError> {
        let addresses = self.rendezvous.resolve_all(self.world_size).await?;

        tracing::info!(handler, world_size = self.world_size, "Fanning out");

        let entries = tokio::time::timeout(self.deadline, self.collect(handler, query, addresses))
            .await
            .map_err(|_| {
                ArgusError::Timeout(format!(
                    "fan-out of {handler} exceeded {:?}",
                    self.deadline
                ))
            })?;

        let report = FanOutReport::new(handler, entries);

        tracing::info!(
            handler,
            ok = report.success_count(),
            failed = report.failure_count(),
            "Fan-out complete"
        );

        Ok(report)
    }

    async fn collect(
        &self,
        handler: &str,
        query: Option<&str>,
        addresses: Vec<WorkerAddress>,
    ) -> Vec<RankResult> {
        let requests = addresses.into_iter().map(|addr| {
            let client = self.client.clone();
            let target = target_url(&addr.url, handler, query);
            async move {
                let outcome = request_outcome(&client, &target).await;
                if let RankOutcome::Failure { reason } = &outcome {
                    tracing::warn!(rank = addr.rank, target = %target, reason = %reason, "Worker request failed");
                }
                RankResult {
                    rank: addr.rank,
                    url: addr.url,
                    outcome,
                }
            }
        });

        // `buffered` keeps at most `concurrency` requests in flight
        // regardless of world size, and yields results in input order, so
        // rank ordering is structural rather than sorted after the fact.
        stream::iter(requests)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Fully qualified target for one worker: {url}/handler/{name}[?query]
fn target_url(base: &str, handler: &str, query: Option<&str>) -> String {
    let mut target = format!(
        "{}{}/{}",
        base.trim_end_matches('/'),
        HANDLER_PATH,
        urlencoding::encode(handler)
    );
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Classify one worker's answer.
///
/// Any HTTP response is a `Success` carrying its status and body - except
/// 404, which the endpoint reserves for "no such handler" and which becomes
/// a `Failure`. Transport errors (refused, timeout, DNS) are `Failure`.
async fn request_outcome(client: &reqwest::Client, target: &str) -> RankOutcome {
    let resp = match client.post(target).send().await {
        Ok(resp) => resp,
        Err(e) => return RankOutcome::failure(e.to_string()),
    };

    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = match resp.bytes().await {
        Ok(body) => body.to_vec(),
        Err(e) => return RankOutcome::failure(format!("failed to read response body: {e}")),
    };

    if status == 404 {
        return RankOutcome::failure(format!(
            "handler not found: {}",
            String::from_utf8_lossy(&body)
        ));
    }

    RankOutcome::Success(HandlerReply {
        status,
        content_type,
        body,
    })
}
