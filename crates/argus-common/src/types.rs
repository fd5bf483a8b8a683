//! Core types shared across Argus components.

use serde::{Deserialize, Serialize};

/// A worker's published debug address.
///
/// Published exactly once per process lifetime, after the debug endpoint
/// has bound its ephemeral port, and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAddress {
    /// The worker's rank (0..world_size)
    pub rank: usize,

    /// Base URL of the worker's debug endpoint, e.g. `http://host:port`
    pub url: String,
}

/// Request delivered to a diagnostic handler.
///
/// The body and query are opaque to the dispatch layer; their meaning is a
/// contract between the caller and the individual handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method the request arrived with
    pub method: String,

    /// Handler name the request was routed to
    pub name: String,

    /// Raw query string, if any (e.g. `onlyactive=true`)
    pub query: Option<String>,

    /// Opaque request body
    pub body: Vec<u8>,
}

/// Reply produced by a diagnostic handler.
///
/// The payload is an opaque byte sequence with a declared content type; no
/// schema is imposed beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerReply {
    /// HTTP status code
    pub status: u16,

    /// Declared content type of the payload
    pub content_type: String,

    /// Opaque payload (base64-encoded in JSON form)
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl HandlerReply {
    pub fn new(status: u16, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body,
        }
    }

    /// 200 reply with the given content type and payload
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(200, content_type, body)
    }

    /// Plain-text reply with the given status
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, "text/plain", message.into().into_bytes())
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of contacting a single rank during a fan-out.
///
/// The distinction between "couldn't ask" and "asked, got an error" is
/// load-bearing: a worker that answered with a non-2xx status is still a
/// `Success` (the transport worked; the diagnostic failed), while transport
/// failures and unknown handler names are `Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RankOutcome {
    /// The worker answered over HTTP (any status code)
    Success(HandlerReply),

    /// The worker could not be asked, or did not know the handler
    Failure { reason: String },
}

impl RankOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true if the worker answered with a 2xx status
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(reply) if reply.is_success())
    }
}

/// One rank's entry in a fan-out report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResult {
    /// The worker's rank
    pub rank: usize,

    /// The base URL the worker was contacted at
    pub url: String,

    /// What happened
    pub outcome: RankOutcome,
}

/// Aggregated result of one fan-out pass.
///
/// Contains exactly `world_size` entries in ascending rank order,
/// regardless of network completion order and of how many workers
/// actually responded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutReport {
    /// Handler name the pass targeted
    pub handler: String,

    /// Completion timestamp (Unix epoch seconds)
    pub completed_at: i64,

    /// Per-rank outcomes, ascending by rank
    pub entries: Vec<RankResult>,
}

impl FanOutReport {
    pub fn new(handler: impl Into<String>, entries: Vec<RankResult>) -> Self {
        Self {
            handler: handler.into(),
            completed_at: chrono::Utc::now().timestamp(),
            entries,
        }
    }

    /// Number of ranks that answered with a 2xx status
    pub fn success_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_success())
            .count()
    }

    /// Number of ranks that could not be asked or errored
    pub fn failure_count(&self) -> usize {
        self.entries.len() - self.success_count()
    }
}

/// Serde adapter: opaque byte payloads as base64 strings in JSON form.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}
