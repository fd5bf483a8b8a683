//! Diagnostic handler capability and registry.
//!
//! A handler is a named capability a worker can perform on request; the
//! registry maps exact, case-sensitive names to handler instances. The
//! registry is populated during single-threaded initialization, frozen
//! behind an `Arc`, and injected into the endpoint router - never mutated
//! at runtime.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use argus_common::{HandlerReply, HandlerRequest};

mod builtin;

pub use builtin::{PingHandler, ProcessInfoHandler};

/// A named diagnostic capability.
///
/// Handlers receive the full request (method, name, query, body) and
/// produce a reply with a status code and an opaque payload. An `Err`
/// return is surfaced to the caller as a 500 reply; the dispatch layer
/// never crashes on a failing handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: HandlerRequest) -> anyhow::Result<HandlerReply>;
}

/// Name-to-handler mapping consulted on every endpoint request.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name. Last registration wins.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(name = %name, "Handler re-registered, replacing earlier registration");
        }
    }

    /// Exact-string, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered handler names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHandler(&'static str);

    #[async_trait]
    impl Handler for FixedHandler {
        async fn handle(&self, _req: HandlerRequest) -> anyhow::Result<HandlerReply> {
            Ok(HandlerReply::text(200, self.0))
        }
    }

    fn request(name: &str) -> HandlerRequest {
        HandlerRequest {
            method: "POST".to_string(),
            name: name.to_string(),
            query: None,
            body: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register("probe", Arc::new(FixedHandler("first")));
        registry.register("probe", Arc::new(FixedHandler("second")));

        assert_eq!(registry.len(), 1);
        let reply = registry
            .get("probe")
            .unwrap()
            .handle(request("probe"))
            .await
            .unwrap();
        assert_eq!(reply.body, b"second");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = HandlerRegistry::new();
        registry.register("ping", Arc::new(FixedHandler("pong")));

        assert!(registry.get("ping").is_some());
        assert!(registry.get("Ping").is_none());
        assert!(registry.get("PING").is_none());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = HandlerRegistry::new();
        registry.register("zeta", Arc::new(FixedHandler("z")));
        registry.register("alpha", Arc::new(FixedHandler("a")));

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
