//! Common error types for Argus components.

use thiserror::Error;

/// Common errors across Argus components.
///
/// Per-worker failures during a fan-out (unreachable endpoint, unknown
/// handler, handler error) are *not* errors - they are carried as data in
/// the per-rank outcome. Only whole-operation failures surface here.
#[derive(Debug, Error)]
pub enum ArgusError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendezvous store connection/operation error
    #[error("Rendezvous store error: {0}")]
    Store(String),

    /// One or more ranks never published an address within the bound
    #[error("Rendezvous resolution timed out: {0}")]
    RendezvousTimeout(String),

    /// The fan-out pass as a whole exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArgusError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Store(_) => 503,
            Self::RendezvousTimeout(_) => 504,
            Self::Timeout(_) => 504,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::RendezvousTimeout(_) | Self::Timeout(_)
        )
    }
}
