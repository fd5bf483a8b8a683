//! Built-in diagnostic handlers.
//!
//! These exercise the wire contract and give every worker a baseline set of
//! capabilities. Payload-producing diagnostics (stack dumps, flight-recorder
//! traces, profilers) are external collaborators registered through the same
//! `HandlerRegistry::register` call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Handler;
use argus_common::{HandlerReply, HandlerRequest};

/// Liveness probe: answers `pong` to anything.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, _req: HandlerRequest) -> anyhow::Result<HandlerReply> {
        Ok(HandlerReply::ok("text/plain", b"pong".to_vec()))
    }
}

#[derive(Serialize)]
struct ProcessInfo {
    rank: usize,
    pid: u32,
    version: &'static str,
    uptime_secs: i64,
}

/// Reports basic process identity and uptime.
pub struct ProcessInfoHandler {
    rank: usize,
    started_at: DateTime<Utc>,
}

impl ProcessInfoHandler {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            started_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Handler for ProcessInfoHandler {
    async fn handle(&self, _req: HandlerRequest) -> anyhow::Result<HandlerReply> {
        let info = ProcessInfo {
            rank: self.rank,
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        };

        Ok(HandlerReply::ok(
            "application/json",
            serde_json::to_vec(&info)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HandlerRequest {
        HandlerRequest {
            method: "POST".to_string(),
            name: "ping".to_string(),
            query: None,
            body: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_ping_replies_pong() {
        let reply = PingHandler.handle(request()).await.unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "text/plain");
        assert_eq!(reply.body, b"pong");
    }

    #[tokio::test]
    async fn test_process_info_shape() {
        let reply = ProcessInfoHandler::new(3).handle(request()).await.unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "application/json");

        let parsed: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(parsed["rank"], 3);
        assert!(parsed["pid"].as_u64().unwrap() > 0);
        assert!(parsed["uptime_secs"].as_i64().unwrap() >= 0);
    }
}
